//! Qdrant vector store integration.

pub mod client;
pub mod payload;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
pub mod types;

pub use client::QdrantService;
pub use payload::{compute_chunk_hash, is_valid_point_id};
pub use scroller::stream_points;
pub use types::{PointInsert, QdrantError, ScoredPoint, StoredPoint};
