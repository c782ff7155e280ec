//! Helpers for constructing and hashing Qdrant payloads.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Payload key holding the chunk text.
pub const TEXT_KEY: &str = "text";
/// Payload key holding the metadata inherited from the parent document.
pub const METADATA_KEY: &str = "metadata";
/// Payload key holding the insertion timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Payload key holding the chunk digest.
pub const CHUNK_HASH_KEY: &str = "chunk_hash";

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(
    text: &str,
    timestamp_rfc3339: &str,
    chunk_hash: &str,
    metadata: &Map<String, Value>,
) -> Value {
    let mut payload = Map::new();
    payload.insert(TEXT_KEY.into(), Value::String(text.to_string()));
    payload.insert(
        TIMESTAMP_KEY.into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    payload.insert(CHUNK_HASH_KEY.into(), Value::String(chunk_hash.to_string()));
    payload.insert(METADATA_KEY.into(), Value::Object(metadata.clone()));
    Value::Object(payload)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier for a new point.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `id` has a shape Qdrant accepts as a point identifier (UUID or unsigned integer).
pub fn is_valid_point_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok() || id.parse::<u64>().is_ok()
}
