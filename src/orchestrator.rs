//! Orchestrator composing retrieval and answer generation behind one API.

use crate::{
    config::Config,
    documents::{
        DeleteOutcome, DocumentInput, DocumentStore, DocumentStoreError, StoreHealth, StoredRecord,
    },
    llm::{
        ChatCompletionClient, ChatModelError, ConversationError, ConversationalModel,
        InMemorySessionStore,
    },
    metrics::{MetricsSnapshot, ServiceMetrics},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while answering a chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Context retrieval failed.
    #[error("Failed to retrieve context: {0}")]
    Retrieval(#[from] DocumentStoreError),
    /// The chat model failed to answer.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] ConversationError),
}

/// Errors that prevent the orchestrator from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The document store could not be initialized.
    #[error("Document store initialization failed: {0}")]
    Store(#[from] DocumentStoreError),
    /// The chat model client could not be built.
    #[error("Chat model initialization failed: {0}")]
    Model(#[from] ChatModelError),
}

/// Abstraction over the chatbot used by the HTTP surface.
#[async_trait]
pub trait ChatbotApi: Send + Sync {
    /// Answer `query` using retrieved context and the session's history.
    async fn chat(&self, query: &str, session_id: Option<&str>) -> Result<String, ChatError>;

    /// Chunk, embed, and store documents, returning the stored record ids.
    async fn add_documents(
        &self,
        items: Vec<DocumentInput>,
    ) -> Result<Vec<String>, DocumentStoreError>;

    /// Nearest records for `query`; `k` defaults to the configured top-k.
    async fn retrieve_docs(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<StoredRecord>, DocumentStoreError>;

    /// Every stored record, oldest first.
    async fn retrieve_all_docs(&self) -> Result<Vec<StoredRecord>, DocumentStoreError>;

    /// The record stored under `id`, if any.
    async fn retrieve_id(&self, id: &str) -> Result<Option<StoredRecord>, DocumentStoreError>;

    /// Delete a stored record; never fails.
    async fn delete_docs(&self, id: &str) -> DeleteOutcome;

    /// Forget a session's history.
    async fn clear_session(&self, session_id: &str) -> bool;

    /// Liveness of the orchestrator itself.
    fn ping(&self) -> bool;

    /// Vector store reachability snapshot.
    async fn store_health(&self) -> StoreHealth;

    /// Current activity counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Wires the document store and the conversational model together.
pub struct ChatbotOrchestrator {
    store: DocumentStore,
    conversation: ConversationalModel,
    metrics: Arc<ServiceMetrics>,
    top_k: usize,
    default_session_id: String,
}

impl ChatbotOrchestrator {
    /// Build every component from configuration. Fails when Qdrant cannot be bootstrapped.
    pub async fn new(config: &Config) -> Result<Self, StartupError> {
        let metrics = Arc::new(ServiceMetrics::new());
        let store = DocumentStore::new(config, Arc::clone(&metrics)).await?;
        let model = Arc::new(ChatCompletionClient::new(config)?);
        let sessions = Arc::new(InMemorySessionStore::new(
            Duration::from_secs(config.session_ttl_secs),
            config.session_max_sessions,
        ));

        Ok(Self::from_parts(
            store,
            ConversationalModel::new(model, sessions),
            metrics,
            config.retrieval_top_k,
            config.default_session_id.clone(),
        ))
    }

    /// Assemble an orchestrator from already-built components.
    pub fn from_parts(
        store: DocumentStore,
        conversation: ConversationalModel,
        metrics: Arc<ServiceMetrics>,
        top_k: usize,
        default_session_id: String,
    ) -> Self {
        Self {
            store,
            conversation,
            metrics,
            top_k,
            default_session_id,
        }
    }

    /// Retrieve the top-k records for `query` and answer it within the session.
    pub async fn chat(&self, query: &str, session_id: Option<&str>) -> Result<String, ChatError> {
        let session_id = session_id.unwrap_or(&self.default_session_id);
        let result = self.answer(query, session_id).await;
        match &result {
            Ok(_) => self.metrics.record_chat_turn(),
            Err(error) => {
                self.metrics.record_chat_failure();
                tracing::warn!(session_id, error = %error, "Chat turn failed");
            }
        }
        result
    }

    async fn answer(&self, query: &str, session_id: &str) -> Result<String, ChatError> {
        let docs = self.store.retrieve(query, self.top_k).await?;
        tracing::debug!(session_id, retrieved = docs.len(), "Context retrieved");
        let reply = self
            .conversation
            .generate_answer(&docs, query, session_id)
            .await?;
        Ok(reply)
    }
}

#[async_trait]
impl ChatbotApi for ChatbotOrchestrator {
    async fn chat(&self, query: &str, session_id: Option<&str>) -> Result<String, ChatError> {
        ChatbotOrchestrator::chat(self, query, session_id).await
    }

    async fn add_documents(
        &self,
        items: Vec<DocumentInput>,
    ) -> Result<Vec<String>, DocumentStoreError> {
        self.store.add_documents(items).await
    }

    async fn retrieve_docs(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<StoredRecord>, DocumentStoreError> {
        self.store.retrieve(query, k.unwrap_or(self.top_k)).await
    }

    async fn retrieve_all_docs(&self) -> Result<Vec<StoredRecord>, DocumentStoreError> {
        let records = self.store.retrieve_all().await?;
        // Count is informational only.
        if let Err(error) = self.store.count().await {
            tracing::debug!(error = %error, "Record count unavailable");
        }
        Ok(records)
    }

    async fn retrieve_id(&self, id: &str) -> Result<Option<StoredRecord>, DocumentStoreError> {
        self.store.retrieve_id(id).await
    }

    async fn delete_docs(&self, id: &str) -> DeleteOutcome {
        self.store.delete_document(id).await
    }

    async fn clear_session(&self, session_id: &str) -> bool {
        self.conversation.clear_session(session_id).await
    }

    fn ping(&self) -> bool {
        true
    }

    async fn store_health(&self) -> StoreHealth {
        self.store.health().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
