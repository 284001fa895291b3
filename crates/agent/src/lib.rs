//! Dialogue Agent - per-message routing and session orchestration
//!
//! This crate is the conversational "brain" of shopmate:
//! - Resolves intent and entities from free text (`nlu`) — fast local rules
//!   first, the external NLU oracle behind them
//! - Routes each message through an ordered resolution cascade to the right
//!   handler (`router`): purchase flow, transactions, order status,
//!   comparison/colors, escalation, fallback
//! - Renders replies from structured facts with deterministic templates
//!   (`render`) and shapes them for the transport (`reply`)
//! - Runs one sequential task per session (`runtime`)
//!
//! # Safety principle
//!
//! The NLU and rendering collaborators are strictly translators. They never
//! decide eligibility, prices, filtering, or state transitions; those are
//! deterministic decisions made here and in `shopmate-core`, and every
//! collaborator failure has a named local fallback.

pub mod nlu;
pub mod render;
pub mod reply;
pub mod router;
pub mod runtime;

pub use nlu::{Entities, Intent, KeywordNlu, NluClient, NluError, NluOutcome};
pub use render::{RenderError, RenderFacts, ResponseRenderer, TemplateRenderer};
pub use reply::{DisplayKind, Reply, TrackingView};
pub use router::{DialogueRouter, RouterDeps};
pub use runtime::SessionRuntime;
