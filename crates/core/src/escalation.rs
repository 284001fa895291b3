//! Turn-count based human-agent handoff policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::customer::UserProfile;
use crate::session::{ConversationTurn, SessionContext};

/// Tokens that accept a pending escalation offer.
pub const ACCEPT_WORDS: &[&str] =
    &["yes", "yeah", "yep", "sure", "ok", "okay", "connect", "agent", "human"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Offer a handoff once the session reaches this many user turns.
    pub offer_after_turns: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self { offer_after_turns: 4 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscalationResponse {
    Accepted,
    Declined,
}

impl EscalationPolicy {
    pub fn new(offer_after_turns: u32) -> Self {
        Self { offer_after_turns: offer_after_turns.max(1) }
    }

    /// True exactly once per session: when the turn counter has reached the
    /// threshold and no offer has been made yet. Declining an offer marks it
    /// as made, so a session is never asked twice.
    pub fn should_offer(&self, context: &SessionContext) -> bool {
        context.turn_count >= self.offer_after_turns && !context.escalation_offered
    }

    pub fn classify_response(&self, message: &str) -> EscalationResponse {
        let accepted = message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .any(|token| ACCEPT_WORDS.contains(&token.to_lowercase().as_str()));

        if accepted {
            EscalationResponse::Accepted
        } else {
            EscalationResponse::Declined
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub success: bool,
}

#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("escalation service unavailable: {0}")]
    Unavailable(String),
}

/// Hands the conversation to a human agent. Failure is not fatal: the router
/// apologises and keeps the session alive.
#[async_trait]
pub trait EscalationGateway: Send + Sync {
    async fn escalate(
        &self,
        user: &UserProfile,
        transcript: &[ConversationTurn],
    ) -> Result<EscalationOutcome, EscalationError>;
}
