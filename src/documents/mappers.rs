//! Mapping helpers between Qdrant payloads and document-store records.

use crate::{
    documents::types::StoredRecord,
    qdrant::{
        self, PointInsert, compute_chunk_hash,
        payload::{METADATA_KEY, TEXT_KEY, TIMESTAMP_KEY},
    },
};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Chunk text with its digest and the metadata inherited from its document.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    pub(crate) text: String,
    pub(crate) chunk_hash: String,
    pub(crate) metadata: Map<String, Value>,
}

impl PreparedChunk {
    pub(crate) fn new(text: String, metadata: &Map<String, Value>) -> Self {
        let chunk_hash = compute_chunk_hash(&text);
        Self {
            text,
            chunk_hash,
            metadata: metadata.clone(),
        }
    }

    pub(crate) fn into_point(self, vector: Vec<f32>) -> PointInsert {
        PointInsert {
            text: self.text,
            chunk_hash: self.chunk_hash,
            vector,
            metadata: self.metadata,
        }
    }
}

/// Split a stored payload into chunk text and inherited metadata.
fn split_payload(mut payload: Map<String, Value>) -> (String, Map<String, Value>) {
    let text = match payload.remove(TEXT_KEY) {
        Some(Value::String(value)) => value,
        _ => String::new(),
    };
    let metadata = match payload.remove(METADATA_KEY) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    (text, metadata)
}

/// Map a Qdrant similarity hit into a scored record.
pub(crate) fn map_scored_point(point: qdrant::ScoredPoint) -> StoredRecord {
    let qdrant::ScoredPoint { id, score, payload } = point;
    let (text, metadata) = split_payload(payload.unwrap_or_default());
    StoredRecord {
        id,
        text,
        metadata,
        score: Some(score),
    }
}

/// Map a Qdrant lookup or scroll result into an unscored record.
pub(crate) fn map_stored_point(point: qdrant::StoredPoint) -> StoredRecord {
    let (text, metadata) = split_payload(point.payload);
    StoredRecord {
        id: point.id,
        text,
        metadata,
        score: None,
    }
}

/// Insertion time recorded in a payload, used to order listings.
///
/// Points without a parsable timestamp sort first.
pub(crate) fn payload_timestamp(point: &qdrant::StoredPoint) -> Option<OffsetDateTime> {
    point
        .payload
        .get(TIMESTAMP_KEY)
        .and_then(Value::as_str)
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[test]
    fn prepared_chunk_carries_hash_and_metadata() {
        let metadata = payload(json!({ "filename": "guide.pdf" }));
        let chunk = PreparedChunk::new("Chunk text".into(), &metadata);
        assert_eq!(chunk.chunk_hash, compute_chunk_hash("Chunk text"));

        let point = chunk.into_point(vec![1.0, 0.0]);
        assert_eq!(point.text, "Chunk text");
        assert_eq!(point.metadata["filename"], "guide.pdf");
        assert_eq!(point.vector, vec![1.0, 0.0]);
    }

    #[test]
    fn map_scored_point_extracts_text_and_metadata() {
        let point = qdrant::ScoredPoint {
            id: "record-1".into(),
            score: 0.42,
            payload: Some(payload(json!({
                "text": "Example",
                "timestamp": "2025-01-01T00:00:00Z",
                "chunk_hash": "abc",
                "metadata": { "filename": "guide.pdf" }
            }))),
        };

        let record = map_scored_point(point);
        assert_eq!(record.id, "record-1");
        assert_eq!(record.text, "Example");
        assert_eq!(record.metadata["filename"], "guide.pdf");
        assert_eq!(record.metadata.len(), 1);
        assert!((record.score.expect("score") - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn map_stored_point_tolerates_missing_fields() {
        let record = map_stored_point(qdrant::StoredPoint {
            id: "7".into(),
            payload: Map::new(),
        });
        assert_eq!(record.id, "7");
        assert!(record.text.is_empty());
        assert!(record.metadata.is_empty());
        assert!(record.score.is_none());
    }

    #[test]
    fn payload_timestamp_parses_rfc3339() {
        let point = qdrant::StoredPoint {
            id: "1".into(),
            payload: payload(json!({ "timestamp": "2025-01-01T00:00:05Z" })),
        };
        let parsed = payload_timestamp(&point).expect("timestamp");
        assert_eq!(parsed.unix_timestamp(), 1_735_689_605);

        let missing = qdrant::StoredPoint {
            id: "2".into(),
            payload: payload(json!({ "timestamp": "yesterday" })),
        };
        assert!(payload_timestamp(&missing).is_none());
    }
}
