use sqlx::Row;

use shopmate_core::{ConversationLog, ConversationTurn, SessionStoreError, TurnRole};

use crate::DbPool;

/// Append-only conversation history. Each inbound message lands as a
/// user/assistant pair; `recent` returns the last `limit` pairs in
/// chronological order, which is also the escalation transcript.
pub struct SqlConversationLog {
    pool: DbPool,
}

impl SqlConversationLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationLog for SqlConversationLog {
    async fn append(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(), SessionStoreError> {
        sqlx::query(
            "INSERT INTO dialogue_turns (user_id, user_message, reply) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(user_message)
        .bind(reply)
        .execute(&self.pool)
        .await
        .map_err(|error| SessionStoreError::Unavailable(error.to_string()))?;

        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SessionStoreError> {
        let rows = sqlx::query(
            "SELECT user_message, reply FROM dialogue_turns \
             WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| SessionStoreError::Unavailable(error.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len() * 2);
        for row in rows.iter().rev() {
            turns.push(ConversationTurn {
                role: TurnRole::User,
                content: row.get("user_message"),
            });
            turns.push(ConversationTurn { role: TurnRole::Assistant, content: row.get("reply") });
        }

        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use shopmate_core::{ConversationLog, TurnRole};

    use crate::{connect_with_settings, migrations};

    use super::SqlConversationLog;

    #[tokio::test]
    async fn recent_returns_pairs_in_chronological_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let log = SqlConversationLog::new(pool);

        log.append("u1", "first question", "first answer").await.expect("append");
        log.append("u1", "second question", "second answer").await.expect("append");
        log.append("u2", "other user", "other answer").await.expect("append");

        let turns = log.recent("u1", 5).await.expect("recent");
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].content, "first question");
        assert_eq!(turns[3].content, "second answer");
    }

    #[tokio::test]
    async fn recent_honours_the_limit() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let log = SqlConversationLog::new(pool);

        for index in 0..5 {
            log.append("u1", &format!("q{index}"), &format!("a{index}")).await.expect("append");
        }

        let turns = log.recent("u1", 2).await.expect("recent");
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "q3");
        assert_eq!(turns[2].content, "q4");
    }
}
