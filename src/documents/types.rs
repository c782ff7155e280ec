//! Core data types and error definitions for the document store.

use crate::{embedding::EmbeddingClientError, qdrant::QdrantError};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while configuring the text splitter.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new text in each chunk.
    #[error("chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured chunk size.
        chunk_size: usize,
        /// Configured overlap.
        chunk_overlap: usize,
    },
}

/// Errors emitted by the document store.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// Splitter configuration was rejected.
    #[error("Failed to configure chunking: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant rejected or failed a request.
    #[error("Vector store request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Returned embedding dimension does not match the collection.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// A unit of text to ingest, with free-form metadata (e.g. `filename`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Full document text.
    pub text: String,
    /// Metadata copied onto every chunk of the document.
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Build a document with no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Input accepted by [`crate::documents::DocumentStore::add_documents`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentInput {
    /// Document with metadata.
    Document(Document),
    /// Raw text without metadata.
    Raw(String),
}

impl DocumentInput {
    pub(crate) fn into_parts(self) -> (String, Map<String, Value>) {
        match self {
            Self::Document(Document { text, metadata }) => (text, metadata),
            Self::Raw(text) => (text, Map::new()),
        }
    }
}

impl From<Document> for DocumentInput {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

impl From<String> for DocumentInput {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<&str> for DocumentInput {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

/// A stored chunk as returned to callers (the embedding is never exposed).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    /// Identifier assigned when the chunk was stored.
    pub id: String,
    /// Chunk text.
    pub text: String,
    /// Metadata inherited from the parent document.
    pub metadata: Map<String, Value>,
    /// Similarity score, present only on retrieval results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Result of a delete request. Deletion never raises; failures are reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Whether a record was removed.
    pub success: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl DeleteOutcome {
    pub(crate) fn deleted(id: &str) -> Self {
        Self {
            success: true,
            message: format!("Document {id} deleted"),
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        Self {
            success: false,
            message: format!("Document {id} not found"),
        }
    }

    pub(crate) fn failed(error: &DocumentStoreError) -> Self {
        Self {
            success: false,
            message: format!("Error: {error}"),
        }
    }
}

/// Reachability and readiness snapshot for the vector store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    /// Whether Qdrant answered the probe.
    pub reachable: bool,
    /// Whether the configured collection exists.
    pub collection_present: bool,
    /// Number of stored records, when the collection exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    /// Diagnostic captured when the probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
