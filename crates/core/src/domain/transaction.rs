use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::customer::UserProfile;
use crate::domain::order::{OrderId, OrderRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Cancellation,
    Return,
    Warranty,
}

impl TransactionKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Cancellation => "CXL",
            Self::Return => "REF",
            Self::Warranty => "WAR",
        }
    }

    /// How the workflow refers to itself in user-facing copy.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Cancellation => "cancellation",
            Self::Return => "return",
            Self::Warranty => "warranty claim",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// `CXL-`/`REF-`/`WAR-` prefix plus an 8-character uppercase token.
    pub fn generate(kind: TransactionKind) -> TransactionId {
        let token: String =
            Uuid::new_v4().simple().to_string().chars().take(8).collect::<String>().to_uppercase();
        TransactionId(format!("{}-{}", kind.id_prefix(), token))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Processing,
    Initiated,
    UnderReview,
}

/// The committed, append-only record persisted through the order store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub user_id: String,
    pub username: String,
    pub order_id: OrderId,
    pub product_id: String,
    pub product_name: String,
    pub reason: String,
    pub amount_jpy: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub requested_at: DateTime<Utc>,
    pub refund_expected: Option<NaiveDate>,
}

impl TransactionRecord {
    pub fn build(
        transaction_id: TransactionId,
        kind: TransactionKind,
        user: &UserProfile,
        order: &OrderRecord,
        reason: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        let (status, refund_expected) = match kind {
            TransactionKind::Cancellation => {
                (TransactionStatus::Processing, Some((requested_at + Duration::days(7)).date_naive()))
            }
            TransactionKind::Return => {
                (TransactionStatus::Initiated, Some((requested_at + Duration::days(7)).date_naive()))
            }
            TransactionKind::Warranty => (TransactionStatus::UnderReview, None),
        };

        Self {
            transaction_id,
            kind,
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            order_id: order.order_id.clone(),
            product_id: order.product_id.clone(),
            product_name: order.product_name.clone(),
            reason: reason.into(),
            amount_jpy: order.price_jpy,
            currency: "JPY".to_string(),
            status,
            requested_at,
            refund_expected,
        }
    }
}

/// Committed transactions grouped the way the history endpoint reports them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub cancellations: Vec<TransactionRecord>,
    pub returns: Vec<TransactionRecord>,
    pub warranty_claims: Vec<TransactionRecord>,
}

impl TransactionHistory {
    pub fn push(&mut self, record: TransactionRecord) {
        match record.kind {
            TransactionKind::Cancellation => self.cancellations.push(record),
            TransactionKind::Return => self.returns.push(record),
            TransactionKind::Warranty => self.warranty_claims.push(record),
        }
    }
}
