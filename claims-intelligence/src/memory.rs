use claims_flow::{Context, MessageRole, Session, SessionStorage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{ClaimsError, Result};

/// One question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Append a question/answer pair to the session transcript.
pub async fn record_exchange(context: &Context, question: String, answer: String) {
    context.add_user_message(question).await;
    context.add_assistant_message(answer).await;
}

/// The session transcript as question/answer pairs, oldest first.
pub async fn transcript(context: &Context) -> Vec<Exchange> {
    let messages = context.get_all_messages().await;
    let mut exchanges = Vec::with_capacity(messages.len() / 2);
    let mut pending_question: Option<String> = None;
    for message in messages {
        match message.role {
            MessageRole::User => pending_question = Some(message.content),
            MessageRole::Assistant => {
                if let Some(question) = pending_question.take() {
                    exchanges.push(Exchange {
                        question,
                        answer: message.content,
                    });
                }
            }
        }
    }
    exchanges
}

/// Per-session conversation memory on top of the workflow session store.
///
/// Sessions are created on first use, expire after the store's idle TTL and
/// can be closed explicitly. Nothing is persisted beyond the process.
#[derive(Clone)]
pub struct SessionMemory {
    storage: Arc<dyn SessionStorage>,
}

impl SessionMemory {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Load a session, or create and store a fresh one positioned at `start_task`.
    pub async fn open(&self, session_id: &str, graph_id: &str, start_task: &str) -> Result<Session> {
        if let Some(session) = self.storage.get(session_id).await.map_err(storage_error)? {
            return Ok(session);
        }
        info!(session_id = %session_id, graph_id = %graph_id, "Creating new session");
        let session = Session::new_from_task(session_id.to_string(), graph_id, start_task);
        self.storage
            .save(session.clone())
            .await
            .map_err(storage_error)?;
        Ok(session)
    }

    pub async fn append(&self, session_id: &str, question: String, answer: String) -> Result<()> {
        let session = self
            .storage
            .get(session_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ClaimsError::input(format!("unknown session {session_id}")))?;
        record_exchange(&session.context, question, answer).await;
        self.storage.save(session).await.map_err(storage_error)
    }

    /// Transcript of a live session; `None` when the session is unknown or expired.
    pub async fn history(&self, session_id: &str) -> Result<Option<Vec<Exchange>>> {
        match self.storage.get(session_id).await.map_err(storage_error)? {
            Some(session) => Ok(Some(transcript(&session.context).await)),
            None => Ok(None),
        }
    }

    /// Discard a session and its transcript. Returns whether it existed.
    pub async fn close(&self, session_id: &str) -> Result<bool> {
        let closed = self.storage.delete(session_id).await.map_err(storage_error)?;
        if closed {
            info!(session_id = %session_id, "Session closed");
        }
        Ok(closed)
    }
}

fn storage_error(error: claims_flow::GraphError) -> ClaimsError {
    ClaimsError::service(format!("session storage: {error}"))
}
