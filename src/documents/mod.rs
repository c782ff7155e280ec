//! Document store: chunking, embedding, and record management over a Qdrant collection.

/// Recursive character splitting used before embedding.
pub mod chunking;
mod mappers;
/// Metadata and filename normalization.
pub mod sanitize;
mod service;
/// Inputs, records, outcomes, and errors.
pub mod types;

pub use chunking::RecursiveSplitter;
pub use service::DocumentStore;
pub use types::{
    ChunkingError, DeleteOutcome, Document, DocumentInput, DocumentStoreError, StoreHealth,
    StoredRecord,
};
