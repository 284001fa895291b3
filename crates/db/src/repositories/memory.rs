use std::collections::HashMap;

use tokio::sync::RwLock;

use shopmate_core::{
    ConversationLog, ConversationTurn, SessionContext, SessionId, SessionStore, SessionStoreError,
    TurnRole,
};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionContext>>,
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionContext>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id.0).cloned())
    }

    async fn save(
        &self,
        session_id: &SessionId,
        context: &SessionContext,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.0.clone(), context.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryConversationLog {
    turns: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

#[async_trait::async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn append(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(), SessionStoreError> {
        let mut turns = self.turns.write().await;
        let history = turns.entry(user_id.to_string()).or_default();
        history.push(ConversationTurn { role: TurnRole::User, content: user_message.to_string() });
        history.push(ConversationTurn { role: TurnRole::Assistant, content: reply.to_string() });
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SessionStoreError> {
        let turns = self.turns.read().await;
        let history = turns.get(user_id).cloned().unwrap_or_default();
        let keep = limit * 2;
        let start = history.len().saturating_sub(keep);
        Ok(history[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use shopmate_core::{SessionContext, SessionId, SessionStore, UserProfile};

    use super::InMemorySessionStore;

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemorySessionStore::default();
        let session_id = SessionId("s".to_string());
        let context = SessionContext::new(UserProfile::new("1", "rio"));

        store.save(&session_id, &context).await.expect("save");
        let loaded = store.load(&session_id).await.expect("load").expect("present");
        assert_eq!(loaded, context);
    }
}
