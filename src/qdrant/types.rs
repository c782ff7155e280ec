//! Public point types and the wire shapes of Qdrant's REST responses.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures talking to the vector store.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// `QDRANT_URL` is not a usable base URL.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// Transport error or undecodable response body.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant answered with a non-success status.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// Status code of the failed call.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },
}

/// Prepared point ready for indexing: chunk text, hash, vector, and inherited metadata.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Raw chunk text.
    pub text: String,
    /// Deterministic hash of the chunk text.
    pub chunk_hash: String,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
    /// Metadata copied from the parent document.
    pub metadata: Map<String, Value>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

/// Point returned by lookups and scrolls (no score, no vector).
#[derive(Debug, Clone)]
pub struct StoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Payload associated with the vector.
    pub payload: Map<String, Value>,
}

/// Qdrant wraps every successful response body in `{"result": ..., "status": ..., "time": ...}`.
#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) result: T,
}

/// `points/query` answers with either a bare list or `{points: [...]}` depending on version.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryHits {
    Bare(Vec<QueryPoint>),
    Wrapped {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

impl QueryHits {
    pub(crate) fn into_points(self) -> Vec<QueryPoint> {
        match self {
            Self::Bare(points) | Self::Wrapped { points } => points,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct PointCount {
    pub(crate) count: u64,
}

/// One page of `points/scroll`.
#[derive(Deserialize)]
pub(crate) struct ScrollPage {
    #[serde(default)]
    pub(crate) points: Vec<RawPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

/// Point as returned by lookups and scrolls, before id normalization.
#[derive(Deserialize)]
pub(crate) struct RawPoint {
    #[serde(default)]
    pub(crate) id: Option<Value>,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

impl RawPoint {
    pub(crate) fn into_stored(self, fallback_id: impl FnOnce() -> Option<String>) -> Option<StoredPoint> {
        let id = match self.id {
            Some(id) => stringify_point_id(id),
            None => fallback_id()?,
        };
        Some(StoredPoint {
            id,
            payload: self.payload.unwrap_or_default(),
        })
    }
}

/// Render a Qdrant point id (string, integer, or `{uuid}` object) as text.
pub(crate) fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(mut map) => match map.remove("uuid") {
            Some(Value::String(uuid)) => uuid,
            Some(other) => other.to_string(),
            None => Value::Object(map).to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
