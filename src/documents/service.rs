//! Document store coordinating chunking, embedding, and Qdrant operations.

use crate::{
    config::Config,
    documents::{
        chunking::RecursiveSplitter,
        mappers::{PreparedChunk, map_scored_point, map_stored_point, payload_timestamp},
        sanitize::sanitize_metadata,
        types::{DeleteOutcome, DocumentInput, DocumentStoreError, StoreHealth, StoredRecord},
    },
    embedding::{EmbeddingClient, get_embedding_client},
    metrics::ServiceMetrics,
    qdrant::{PointInsert, QdrantService, StoredPoint, is_valid_point_id, stream_points},
};
use futures_util::TryStreamExt;
use std::sync::Arc;

/// Owns the embedding client, the Qdrant transport, and the chunking policy for one collection.
///
/// Every chunk is embedded with the same provider configuration and each returned vector is
/// checked against the collection dimension before anything is written. Construct the store
/// once near process start and share it through an `Arc`.
pub struct DocumentStore {
    embedding_client: Box<dyn EmbeddingClient>,
    qdrant_service: QdrantService,
    collection: String,
    dimension: usize,
    splitter: RecursiveSplitter,
    metrics: Arc<ServiceMetrics>,
}

impl DocumentStore {
    /// Build the store and make sure its collection and payload indexes exist.
    pub async fn new(
        config: &Config,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self, DocumentStoreError> {
        let embedding_client = get_embedding_client(config)?;
        let qdrant_service = QdrantService::new(config)?;
        let splitter = RecursiveSplitter::new(
            config.text_splitter_chunk_size,
            config.text_splitter_chunk_overlap,
        )?;

        let collection = config.qdrant_collection_name.clone();
        let vector_size = config.embedding_dimension as u64;
        tracing::debug!(collection = %collection, vector_size, "Ensuring document collection");
        qdrant_service
            .create_collection_if_not_exists(&collection, vector_size)
            .await?;
        qdrant_service.ensure_payload_indexes(&collection).await?;
        tracing::info!(
            collection = %collection,
            chunk_size = splitter.chunk_size(),
            chunk_overlap = splitter.chunk_overlap(),
            "Document store ready"
        );

        Ok(Self::from_parts(
            embedding_client,
            qdrant_service,
            collection,
            config.embedding_dimension,
            splitter,
            metrics,
        ))
    }

    /// Assemble a store from already-initialized parts without touching Qdrant.
    pub fn from_parts(
        embedding_client: Box<dyn EmbeddingClient>,
        qdrant_service: QdrantService,
        collection: String,
        dimension: usize,
        splitter: RecursiveSplitter,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            embedding_client,
            qdrant_service,
            collection,
            dimension,
            splitter,
            metrics,
        }
    }

    /// Chunk, embed, and store every input, returning the assigned ids in chunk order.
    pub async fn add_documents(
        &self,
        items: Vec<DocumentInput>,
    ) -> Result<Vec<String>, DocumentStoreError> {
        let mut prepared = Vec::new();
        let mut per_document = Vec::with_capacity(items.len());
        for item in items {
            let (text, metadata) = item.into_parts();
            let metadata = sanitize_metadata(metadata);
            let chunks = self.splitter.split_text(&text);
            per_document.push(chunks.len() as u64);
            prepared.extend(
                chunks
                    .into_iter()
                    .map(|chunk| PreparedChunk::new(chunk, &metadata)),
            );
        }

        if prepared.is_empty() {
            tracing::debug!(
                documents = per_document.len(),
                "No chunks produced; skipping store"
            );
            return Ok(Vec::new());
        }

        let texts: Vec<String> = prepared.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding_client.generate_embeddings(texts).await?;
        self.check_dimensions(&embeddings)?;

        let points: Vec<PointInsert> = prepared
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| chunk.into_point(vector))
            .collect();
        let ids = self
            .qdrant_service
            .index_points(&self.collection, points)
            .await?;

        for chunks in per_document.into_iter().filter(|count| *count > 0) {
            self.metrics.record_document(chunks);
        }
        tracing::info!(
            collection = %self.collection,
            chunks = ids.len(),
            "Documents stored"
        );
        Ok(ids)
    }

    /// Return at most `k` records nearest to `query`, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<StoredRecord>, DocumentStoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embeddings = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        self.check_dimensions(&embeddings)?;
        let Some(vector) = embeddings.into_iter().next() else {
            return Ok(Vec::new());
        };

        let hits = self
            .qdrant_service
            .search_points(&self.collection, vector, k)
            .await?;
        let mut records: Vec<StoredRecord> = hits.into_iter().map(map_scored_point).collect();
        records.truncate(k);
        tracing::debug!(
            collection = %self.collection,
            k,
            hits = records.len(),
            "Retrieved records"
        );
        Ok(records)
    }

    /// Every stored record (no embeddings), oldest insertion first.
    pub async fn retrieve_all(&self) -> Result<Vec<StoredRecord>, DocumentStoreError> {
        let mut points: Vec<StoredPoint> = stream_points(&self.qdrant_service, &self.collection)
            .try_collect()
            .await?;
        points.sort_by_key(payload_timestamp);
        tracing::debug!(collection = %self.collection, records = points.len(), "Listed records");
        Ok(points.into_iter().map(map_stored_point).collect())
    }

    /// The record stored under `id`, if any.
    pub async fn retrieve_id(&self, id: &str) -> Result<Option<StoredRecord>, DocumentStoreError> {
        if !is_valid_point_id(id) {
            tracing::debug!(id, "Ignoring lookup for malformed record id");
            return Ok(None);
        }
        let point = self.qdrant_service.get_point(&self.collection, id).await?;
        Ok(point.map(map_stored_point))
    }

    /// Delete the record stored under `id`. Failures are reported in the outcome.
    pub async fn delete_document(&self, id: &str) -> DeleteOutcome {
        match self.try_delete(id).await {
            Ok(true) => {
                self.metrics.record_deletion();
                tracing::info!(collection = %self.collection, id, "Record deleted");
                DeleteOutcome::deleted(id)
            }
            Ok(false) => {
                tracing::debug!(collection = %self.collection, id, "Record not found for deletion");
                DeleteOutcome::not_found(id)
            }
            Err(error) => {
                tracing::error!(collection = %self.collection, id, error = %error, "Record deletion failed");
                DeleteOutcome::failed(&error)
            }
        }
    }

    async fn try_delete(&self, id: &str) -> Result<bool, DocumentStoreError> {
        if self.retrieve_id(id).await?.is_none() {
            return Ok(false);
        }
        self.qdrant_service
            .delete_points(&self.collection, &[id.to_string()])
            .await?;
        Ok(true)
    }

    /// Exact number of stored records.
    pub async fn count(&self) -> Result<u64, DocumentStoreError> {
        let count = self.qdrant_service.count_points(&self.collection).await?;
        tracing::info!(collection = %self.collection, count, "Counted stored records");
        Ok(count)
    }

    /// Probe Qdrant to surface a lightweight health snapshot.
    pub async fn health(&self) -> StoreHealth {
        let present = match self.qdrant_service.collection_exists(&self.collection).await {
            Ok(present) => present,
            Err(error) => {
                tracing::warn!(error = %error, "Vector store health probe failed");
                return StoreHealth {
                    reachable: false,
                    collection_present: false,
                    record_count: None,
                    error: Some(error.to_string()),
                };
            }
        };

        let (record_count, error) = if present {
            match self.qdrant_service.count_points(&self.collection).await {
                Ok(count) => (Some(count), None),
                Err(error) => (None, Some(error.to_string())),
            }
        } else {
            (None, None)
        };

        StoreHealth {
            reachable: true,
            collection_present: present,
            record_count,
            error,
        }
    }

    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<(), DocumentStoreError> {
        match embeddings
            .iter()
            .find(|vector| vector.len() != self.dimension)
        {
            Some(vector) => Err(DocumentStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{documents::Document, embedding::EmbeddingClientError, qdrant::client::test_service};
    use async_trait::async_trait;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;
    use std::sync::Mutex;

    /// Deterministic embedder: a one-hot vector chosen by text length.
    struct FakeEmbedder {
        dimension: usize,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for Arc<FakeEmbedder> {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.lock().expect("calls").push(texts.clone());
            Ok(texts
                .iter()
                .map(|text| {
                    let mut vector = vec![0.0; self.dimension];
                    vector[text.len() % self.dimension] = 1.0;
                    vector
                })
                .collect())
        }
    }

    fn store(server: &MockServer, embedder: Arc<FakeEmbedder>, dimension: usize) -> DocumentStore {
        DocumentStore::from_parts(
            Box::new(embedder),
            test_service(server.base_url()),
            "docs".into(),
            dimension,
            RecursiveSplitter::new(40, 0).expect("splitter"),
            Arc::new(ServiceMetrics::new()),
        )
    }

    const ID_A: &str = "3f1c6d8e-9a41-4c36-9b2f-5f1d2c3b4a51";

    #[tokio::test]
    async fn add_documents_embeds_in_one_batch_and_inherits_metadata() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/docs/points")
                    .body_contains("\"filename\":\"guide.pdf\"")
                    .body_contains("\"text\":\"Second paragraph here.\"");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let embedder = Arc::new(FakeEmbedder::new(4));
        let store = store(&server, embedder.clone(), 4);
        let document = Document::new("First paragraph is here.\n\nSecond paragraph here.")
            .with_metadata("filename", "guide.pdf");
        let ids = store
            .add_documents(vec![document.into(), "   ".into()])
            .await
            .expect("stored");

        upsert.assert();
        assert_eq!(ids.len(), 2);
        let calls = embedder.calls.lock().expect("calls");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["First paragraph is here.", "Second paragraph here."]
        );
        let snapshot = store.metrics.snapshot();
        assert_eq!(snapshot.documents_indexed, 1);
        assert_eq!(snapshot.chunks_indexed, 2);
    }

    #[tokio::test]
    async fn add_documents_with_no_chunks_skips_everything() {
        let server = MockServer::start_async().await;
        let embedder = Arc::new(FakeEmbedder::new(4));
        let store = store(&server, embedder.clone(), 4);
        let ids = store
            .add_documents(vec!["".into(), "\n\n".into()])
            .await
            .expect("ok");
        assert!(ids.is_empty());
        assert!(embedder.calls.lock().expect("calls").is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_before_writing() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/docs/points");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(3)), 4);
        let error = store
            .add_documents(vec!["Some text".into()])
            .await
            .expect_err("mismatch");
        assert!(matches!(
            error,
            DocumentStoreError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
        upsert.assert_hits(0);
    }

    #[tokio::test]
    async fn retrieve_returns_at_most_k_records() {
        let server = MockServer::start_async().await;
        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/docs/points/query")
                    .body_contains("\"limit\":2");
                then.status(200).json_body(json!({
                    "result": { "points": [
                        { "id": ID_A, "score": 0.9, "payload": { "text": "one", "metadata": {} } },
                        { "id": 2, "score": 0.8, "payload": { "text": "two" } },
                        { "id": 3, "score": 0.7, "payload": { "text": "three" } }
                    ] }
                }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let records = store.retrieve("question", 2).await.expect("records");
        query.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, ID_A);
        assert_eq!(records[1].text, "two");
    }

    #[tokio::test]
    async fn retrieve_with_zero_k_makes_no_calls() {
        let server = MockServer::start_async().await;
        let embedder = Arc::new(FakeEmbedder::new(4));
        let store = store(&server, embedder.clone(), 4);
        assert!(store.retrieve("question", 0).await.expect("ok").is_empty());
        assert!(embedder.calls.lock().expect("calls").is_empty());
    }

    #[tokio::test]
    async fn retrieve_all_orders_by_insertion_time() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/scroll");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "id": 2, "payload": { "text": "later", "timestamp": "2025-01-02T00:00:00Z" } },
                            { "id": 1, "payload": { "text": "earlier", "timestamp": "2025-01-01T00:00:00Z" } }
                        ],
                        "next_page_offset": null
                    }
                }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let records = store.retrieve_all().await.expect("records");
        let texts: Vec<_> = records.iter().map(|record| record.text.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "later"]);
    }

    #[tokio::test]
    async fn retrieve_id_skips_malformed_ids() {
        let server = MockServer::start_async().await;
        let lookup = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/collections/docs/points/");
                then.status(200).json_body(json!({ "result": null }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        assert!(store.retrieve_id("not-an-id").await.expect("ok").is_none());
        lookup.assert_hits(0);
    }

    #[tokio::test]
    async fn delete_document_reports_missing_record() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/collections/docs/points/{ID_A}"));
                then.status(404).json_body(json!({ "status": { "error": "Not found" } }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/delete");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let outcome = store.delete_document(ID_A).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, format!("Document {ID_A} not found"));
        delete.assert_hits(0);
    }

    #[tokio::test]
    async fn delete_document_removes_existing_record() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/collections/docs/points/{ID_A}"));
                then.status(200).json_body(json!({
                    "result": { "id": ID_A, "payload": { "text": "stored" } }
                }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/docs/points/delete")
                    .query_param("wait", "true")
                    .json_body(json!({ "points": [ID_A] }));
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let outcome = store.delete_document(ID_A).await;
        delete.assert();
        assert!(outcome.success);
        assert_eq!(store.metrics.snapshot().documents_deleted, 1);
    }

    #[tokio::test]
    async fn delete_document_reports_failures_without_raising() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/collections/docs/points/{ID_A}"));
                then.status(500).body("storage offline");
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let outcome = store.delete_document(ID_A).await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Error: "));
        assert!(outcome.message.contains("storage offline"));
    }

    #[tokio::test]
    async fn health_reports_unreachable_store() {
        let store = DocumentStore::from_parts(
            Box::new(Arc::new(FakeEmbedder::new(4))),
            test_service("http://127.0.0.1:9".into()),
            "docs".into(),
            4,
            RecursiveSplitter::new(40, 0).expect("splitter"),
            Arc::new(ServiceMetrics::new()),
        );
        let health = store.health().await;
        assert!(!health.reachable);
        assert!(health.error.is_some());
    }

    #[tokio::test]
    async fn health_includes_record_count() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/docs");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/count");
                then.status(200).json_body(json!({ "result": { "count": 3 } }));
            })
            .await;

        let store = store(&server, Arc::new(FakeEmbedder::new(4)), 4);
        let health = store.health().await;
        assert!(health.reachable);
        assert!(health.collection_present);
        assert_eq!(health.record_count, Some(3));
    }
}
