//! Order/transaction store collaborator.
//!
//! The backing implementation (vector index, database, remote service) is
//! irrelevant here; the router only needs lookups, an append-only commit, and
//! grouped history.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::customer::{CustomerId, UserProfile};
use crate::domain::order::{OrderId, OrderRecord};
use crate::domain::transaction::{TransactionHistory, TransactionId, TransactionKind};

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
    #[error("order record could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, OrderStoreError>;

    async fn orders_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<OrderRecord>, OrderStoreError>;

    /// Persists the committed transaction and returns its generated id.
    /// Records are append-only and keyed by that id.
    async fn commit(
        &self,
        kind: TransactionKind,
        user: &UserProfile,
        order: &OrderRecord,
        reason: &str,
    ) -> Result<TransactionId, OrderStoreError>;

    async fn history(&self, user_id: &str) -> Result<TransactionHistory, OrderStoreError>;
}
