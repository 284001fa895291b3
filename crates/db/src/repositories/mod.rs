use thiserror::Error;

pub mod conversation;
pub mod memory;
pub mod session;

pub use conversation::SqlConversationLog;
pub use memory::{InMemoryConversationLog, InMemorySessionStore};
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
