//! Per-session conversation state.
//!
//! The session phase is a sum type rather than a bag of boolean flags: the
//! waiting states are mutually exclusive by construction, and the in-flight
//! transaction snapshot exists exactly while a phase carries it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::customer::UserProfile;
use crate::domain::order::OrderRecord;
use crate::domain::product::ProductRecord;
use crate::domain::transaction::TransactionKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    AwaitingOrderId {
        kind: TransactionKind,
    },
    /// The warranty policy has been shown; waiting for an explicit go-ahead.
    /// `order` is present when the claim arrived with a known order and
    /// absent when the user started from a policy question.
    AwaitingWarrantyPolicyAck {
        order: Option<OrderRecord>,
    },
    AwaitingReason {
        kind: TransactionKind,
        order: OrderRecord,
    },
    AwaitingConfirmation {
        kind: TransactionKind,
        order: OrderRecord,
        reason: String,
    },
    EscalationOffered,
}

impl Phase {
    pub fn is_waiting(&self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// The transaction kind mid-flight, if any.
    pub fn transaction_kind(&self) -> Option<TransactionKind> {
        match self {
            Phase::AwaitingOrderId { kind }
            | Phase::AwaitingReason { kind, .. }
            | Phase::AwaitingConfirmation { kind, .. } => Some(*kind),
            Phase::AwaitingWarrantyPolicyAck { .. } => Some(TransactionKind::Warranty),
            Phase::Idle | Phase::EscalationOffered => None,
        }
    }
}

/// Ranked results from the most recent product search, kept so follow-up
/// questions (colors, comparisons) can refer back to them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductCache {
    pub products: Vec<ProductRecord>,
    pub last_search_query: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user: UserProfile,
    pub phase: Phase,
    pub in_purchase_flow: bool,
    pub product_cache: Option<ProductCache>,
    pub turn_count: u32,
    pub escalation_offered: bool,
    pub escalated: bool,
}

impl SessionContext {
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            phase: Phase::Idle,
            in_purchase_flow: false,
            product_cache: None,
            turn_count: 0,
            escalation_offered: false,
            escalated: false,
        }
    }

    /// Main-menu reset: everything except the identity snapshot.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.in_purchase_flow = false;
        self.product_cache = None;
        self.turn_count = 0;
        self.escalation_offered = false;
        self.escalated = false;
    }

    /// Drops purchase context so a stale product list cannot leak into
    /// unrelated replies.
    pub fn clear_purchase(&mut self) {
        self.in_purchase_flow = false;
        self.product_cache = None;
    }

    /// Ends any in-flight transaction or escalation wait.
    pub fn clear_transaction(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn cached_products(&self) -> &[ProductRecord] {
        self.product_cache.as_ref().map(|cache| cache.products.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("stored context could not be decoded: {0}")]
    Decode(String),
}

/// Durable per-session context, reloaded at the start of every message.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionContext>, SessionStoreError>;
    async fn save(
        &self,
        session_id: &SessionId,
        context: &SessionContext,
    ) -> Result<(), SessionStoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Append-only conversation history, also used as the escalation transcript.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(), SessionStoreError>;

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SessionStoreError>;
}

#[cfg(test)]
mod tests {
    use crate::domain::customer::UserProfile;
    use crate::domain::order::{OrderId, OrderRecord, OrderStatus};
    use crate::domain::transaction::TransactionKind;

    use super::{Phase, ProductCache, SessionContext};

    fn order() -> OrderRecord {
        OrderRecord {
            order_id: OrderId("ORD-1001".to_string()),
            product_id: "lap-1".to_string(),
            product_name: "HP Pavilion 15".to_string(),
            price_jpy: 149_833,
            status: OrderStatus::Delivered,
            order_date: "2026-06-15".to_string(),
            delivery_date: "2026-06-20".to_string(),
            carrier: "Sagawa".to_string(),
            tracking_number: "700000000001".to_string(),
            image_url: String::new(),
        }
    }

    fn context() -> SessionContext {
        SessionContext::new(UserProfile::new("31", "aoi"))
    }

    #[test]
    fn waiting_phases_carry_their_transaction() {
        let phase = Phase::AwaitingConfirmation {
            kind: TransactionKind::Return,
            order: order(),
            reason: "Faulty/Defective".to_string(),
        };
        assert!(phase.is_waiting());
        assert_eq!(phase.transaction_kind(), Some(TransactionKind::Return));
        assert_eq!(Phase::Idle.transaction_kind(), None);
        assert_eq!(
            Phase::AwaitingWarrantyPolicyAck { order: None }.transaction_kind(),
            Some(TransactionKind::Warranty)
        );
    }

    #[test]
    fn reset_preserves_identity_only() {
        let mut ctx = context();
        ctx.turn_count = 5;
        ctx.escalation_offered = true;
        ctx.in_purchase_flow = true;
        ctx.product_cache =
            Some(ProductCache { products: Vec::new(), last_search_query: "hp".to_string() });
        ctx.phase = Phase::AwaitingOrderId { kind: TransactionKind::Cancellation };

        let user = ctx.user.clone();
        ctx.reset();

        assert_eq!(ctx.user, user);
        assert_eq!(ctx.phase, Phase::Idle);
        assert_eq!(ctx.turn_count, 0);
        assert!(!ctx.escalation_offered);
        assert!(!ctx.in_purchase_flow);
        assert!(ctx.product_cache.is_none());
    }

    #[test]
    fn phase_round_trips_through_json() {
        let phase = Phase::AwaitingReason { kind: TransactionKind::Warranty, order: order() };
        let encoded = serde_json::to_string(&phase).expect("encode");
        let decoded: Phase = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, phase);
    }
}
