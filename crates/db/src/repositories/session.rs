use sqlx::Row;

use shopmate_core::{SessionContext, SessionId, SessionStore, SessionStoreError};

use crate::DbPool;

/// Session context persisted as a JSON document keyed by session id. The
/// context is small and read/written once per message, so a single row with
/// an upsert is all this needs.
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionContext>, SessionStoreError> {
        let row = sqlx::query("SELECT context FROM dialogue_sessions WHERE session_id = ?")
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| SessionStoreError::Unavailable(error.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("context");
        let context = serde_json::from_str(&raw)
            .map_err(|error| SessionStoreError::Decode(error.to_string()))?;
        Ok(Some(context))
    }

    async fn save(
        &self,
        session_id: &SessionId,
        context: &SessionContext,
    ) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(context)
            .map_err(|error| SessionStoreError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO dialogue_sessions (session_id, user_id, context, updated_at) \
             VALUES (?, ?, ?, datetime('now')) \
             ON CONFLICT(session_id) DO UPDATE SET \
                 context = excluded.context, \
                 updated_at = excluded.updated_at",
        )
        .bind(&session_id.0)
        .bind(&context.user.user_id)
        .bind(encoded)
        .execute(&self.pool)
        .await
        .map_err(|error| SessionStoreError::Unavailable(error.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shopmate_core::{
        Phase, SessionContext, SessionId, SessionStore, TransactionKind, UserProfile,
    };

    use crate::{connect_with_settings, migrations};

    use super::SqlSessionStore;

    #[tokio::test]
    async fn context_round_trips_through_sqlite() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlSessionStore::new(pool);

        let session_id = SessionId("sess-1".to_string());
        let mut context = SessionContext::new(UserProfile::new("42", "hana"));
        context.turn_count = 3;
        context.phase = Phase::AwaitingOrderId { kind: TransactionKind::Return };

        store.save(&session_id, &context).await.expect("save");
        let loaded = store.load(&session_id).await.expect("load").expect("present");

        assert_eq!(loaded, context);
    }

    #[tokio::test]
    async fn save_overwrites_previous_context() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlSessionStore::new(pool);

        let session_id = SessionId("sess-2".to_string());
        let mut context = SessionContext::new(UserProfile::new("7", "kenji"));
        store.save(&session_id, &context).await.expect("first save");

        context.turn_count = 9;
        store.save(&session_id, &context).await.expect("second save");

        let loaded = store.load(&session_id).await.expect("load").expect("present");
        assert_eq!(loaded.turn_count, 9);
    }

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlSessionStore::new(pool);

        let loaded = store.load(&SessionId("nope".to_string())).await.expect("load");
        assert!(loaded.is_none());
    }
}
