pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{FixtureEscalationGateway, FixtureOrderStore, FixtureSearchIndex};
pub use repositories::{
    InMemoryConversationLog, InMemorySessionStore, RepositoryError, SqlConversationLog,
    SqlSessionStore,
};
