//! Per-session execution model.
//!
//! Each active session gets one lightweight task and a mailbox. Messages for
//! a session are processed strictly sequentially — transitions are
//! context-dependent and not idempotent — while different sessions proceed
//! independently. Context is reloaded from durable storage at the start of
//! every message and persisted (with the turn appended) before the reply is
//! released, so a crash between messages loses at most the in-flight turn.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use shopmate_core::{ConversationLog, SessionContext, SessionId, SessionStore, UserProfile};

use crate::nlu::{Entities, Intent};
use crate::reply::{base_buttons, Reply};
use crate::router::DialogueRouter;

const MAILBOX_DEPTH: usize = 16;

struct Envelope {
    user: UserProfile,
    message: String,
    respond: oneshot::Sender<Reply>,
}

pub struct SessionRuntime {
    router: Arc<DialogueRouter>,
    store: Arc<dyn SessionStore>,
    log: Arc<dyn ConversationLog>,
    sessions: Mutex<HashMap<String, mpsc::Sender<Envelope>>>,
}

impl SessionRuntime {
    pub fn new(
        router: Arc<DialogueRouter>,
        store: Arc<dyn SessionStore>,
        log: Arc<dyn ConversationLog>,
    ) -> Self {
        Self { router, store, log, sessions: Mutex::new(HashMap::new()) }
    }

    /// Enqueues one message for its session and waits for the reply. Safe to
    /// call concurrently; per-session ordering is the enqueue order.
    pub async fn dispatch(
        &self,
        session_id: &SessionId,
        user: &UserProfile,
        message: &str,
    ) -> Reply {
        let envelope = |respond| Envelope {
            user: user.clone(),
            message: message.to_string(),
            respond,
        };

        let (tx, rx) = oneshot::channel();
        let sender = self.sender_for(session_id).await;
        if sender.send(envelope(tx)).await.is_err() {
            // The task ended (transport close or fault); start a fresh one
            // and retry once. The durable context survives either way.
            self.sessions.lock().await.remove(&session_id.0);
            let (tx, rx) = oneshot::channel();
            let sender = self.sender_for(session_id).await;
            if sender.send(envelope(tx)).await.is_err() {
                return fault_reply();
            }
            return rx.await.unwrap_or_else(|_| fault_reply());
        }

        rx.await.unwrap_or_else(|_| fault_reply())
    }

    /// Ends the session task. In-flight messages finish first; committed
    /// state is durable, and an abandoned confirmation is simply discarded.
    pub async fn end_session(&self, session_id: &SessionId) {
        self.sessions.lock().await.remove(&session_id.0);
    }

    async fn sender_for(&self, session_id: &SessionId) -> mpsc::Sender<Envelope> {
        let mut sessions = self.sessions.lock().await;

        if let Some(sender) = sessions.get(&session_id.0) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }

        let (sender, receiver) = mpsc::channel(MAILBOX_DEPTH);
        tokio::spawn(session_task(
            Arc::clone(&self.router),
            Arc::clone(&self.store),
            Arc::clone(&self.log),
            session_id.clone(),
            receiver,
        ));
        sessions.insert(session_id.0.clone(), sender.clone());
        sender
    }
}

async fn session_task(
    router: Arc<DialogueRouter>,
    store: Arc<dyn SessionStore>,
    log: Arc<dyn ConversationLog>,
    session_id: SessionId,
    mut mailbox: mpsc::Receiver<Envelope>,
) {
    while let Some(envelope) = mailbox.recv().await {
        let mut context = match store.load(&session_id).await {
            Ok(Some(context)) => context,
            Ok(None) => SessionContext::new(envelope.user.clone()),
            Err(error) => {
                tracing::warn!(
                    event_name = "session.load_degraded",
                    session_id = %session_id,
                    error = %error,
                    "starting from a fresh context"
                );
                SessionContext::new(envelope.user.clone())
            }
        };

        let reply = router.handle_message(&mut context, &envelope.message).await;

        if let Err(error) = store.save(&session_id, &context).await {
            tracing::warn!(
                event_name = "session.save_degraded",
                session_id = %session_id,
                error = %error,
                "context not persisted; this turn's deltas are at risk"
            );
        }
        if let Err(error) =
            log.append(&context.user.user_id, &envelope.message, &reply.response).await
        {
            tracing::warn!(
                event_name = "session.log_degraded",
                session_id = %session_id,
                error = %error,
                "conversation turn not appended"
            );
        }

        let _ = envelope.respond.send(reply);
    }
}

/// Last-resort reply when the session task itself failed; the user always
/// receives an answer.
fn fault_reply() -> Reply {
    Reply::new(
        "I'm having trouble processing your request right now. How can I help you with Shopmate today?",
        Intent::GeneralQuestion,
        Entities::new(),
    )
    .with_buttons(base_buttons())
}
