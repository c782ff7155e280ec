//! Grounded, session-aware answer generation.

use super::{
    client::{ChatMessage, ChatModel, ChatModelError},
    history::SessionStore,
    prompt::{SYSTEM_PROMPT, build_context, build_user_turn},
};
use crate::documents::StoredRecord;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// Chat model request failed; history was left untouched.
    #[error(transparent)]
    Model(#[from] ChatModelError),
}

/// Answers questions from retrieved context while keeping one history per session.
pub struct ConversationalModel {
    model: Arc<dyn ChatModel>,
    sessions: Arc<dyn SessionStore>,
}

impl ConversationalModel {
    /// Combine a chat model with the session store that keeps its histories.
    pub fn new(model: Arc<dyn ChatModel>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { model, sessions }
    }

    /// Answer `question` from `docs` and the prior turns of `session_id`.
    ///
    /// The combined user turn and the reply are appended to the session only when the model
    /// call succeeds. Turns on one session run one at a time.
    pub async fn generate_answer(
        &self,
        docs: &[StoredRecord],
        question: &str,
        session_id: &str,
    ) -> Result<String, ConversationError> {
        let context = build_context(docs.iter().map(|doc| doc.text.as_str()));
        let user_turn = build_user_turn(question, &context);

        let history = self.sessions.history(session_id).await;
        let mut history = history.lock().await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(history.messages().iter().cloned());
        messages.push(ChatMessage::user(user_turn.clone()));

        tracing::debug!(
            session_id,
            prior_messages = history.len(),
            context_passages = docs.len(),
            "Generating answer"
        );
        let reply = self.model.complete(&messages).await?;

        history.push_exchange(
            ChatMessage::user(user_turn),
            ChatMessage::assistant(reply.clone()),
        );
        Ok(reply)
    }

    #[cfg(test)]
    pub(crate) async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        let history = self.sessions.history(session_id).await;
        let messages = history.lock().await.messages().to_vec();
        messages
    }

    /// Forget a session's history. Returns whether it existed.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        let cleared = self.sessions.remove(session_id).await;
        tracing::info!(session_id, cleared, "Cleared session history");
        cleared
    }
}
