//! REST client for the handful of Qdrant endpoints the document store needs.

use crate::config::Config;
use crate::qdrant::{
    payload::{CHUNK_HASH_KEY, TIMESTAMP_KEY, build_payload, current_timestamp_rfc3339, generate_point_id},
    types::{
        Envelope, PointCount, PointInsert, QdrantError, QueryHits, RawPoint, ScoredPoint,
        StoredPoint, stringify_point_id,
    },
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Payload fields indexed at startup, with their Qdrant schema.
const PAYLOAD_INDEXES: [(&str, &str); 3] = [
    (TIMESTAMP_KEY, "datetime"),
    (CHUNK_HASH_KEY, "keyword"),
    ("metadata.filename", "keyword"),
];

/// Qdrant connection: shared `reqwest` client, base URL and optional API key.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Build a client for `QDRANT_URL` with the configured request timeout.
    pub fn new(config: &Config) -> Result<Self, QdrantError> {
        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        let client = Client::builder()
            .user_agent(concat!("ragchat/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        let api_key = config
            .qdrant_api_key
            .clone()
            .filter(|value| !value.is_empty());
        tracing::debug!(url = %base_url, has_api_key = api_key.is_some(), "Qdrant client ready");

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create `collection_name` with cosine distance unless it already exists.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            tracing::debug!(collection = collection_name, "Collection already present");
            return Ok(());
        }

        tracing::info!(collection = collection_name, vector_size, "Creating collection");
        let body = json!({ "vectors": { "size": vector_size, "distance": "Cosine" } });
        let request = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body);
        send_checked(request, "create collection").await?;
        Ok(())
    }

    /// Index the payload fields used for listing and lookups. Index failures are logged, not
    /// returned, since the collection stays usable without them.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        for (field, schema) in PAYLOAD_INDEXES {
            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .json(&json!({ "field_name": field, "field_schema": schema }))
                .send()
                .await?;

            let status = response.status();
            if status.is_success() || status == StatusCode::CONFLICT {
                tracing::debug!(collection = collection_name, field, schema, "Payload index ready");
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    collection = collection_name,
                    field,
                    status = %status,
                    body = %body,
                    "Payload index not created"
                );
            }
        }
        Ok(())
    }

    /// Upsert `points` under fresh UUIDs and return those ids in input order.
    pub async fn index_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
    ) -> Result<Vec<String>, QdrantError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = current_timestamp_rfc3339();
        let (ids, bodies): (Vec<String>, Vec<_>) = points
            .into_iter()
            .map(|point| {
                let id = generate_point_id();
                let body = json!({
                    "id": id,
                    "vector": point.vector,
                    "payload": build_payload(&point.text, &timestamp, &point.chunk_hash, &point.metadata),
                });
                (id, body)
            })
            .unzip();

        let request = self
            .request(Method::PUT, &format!("collections/{collection_name}/points"))
            .query(&[("wait", true)])
            .json(&json!({ "points": bodies }));
        send_checked(request, "upsert points").await?;
        tracing::debug!(collection = collection_name, points = ids.len(), "Points indexed");
        Ok(ids)
    }

    /// Nearest neighbours of `vector`, best first, with payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let request = self
            .request(Method::POST, &format!("collections/{collection_name}/points/query"))
            .json(&json!({ "query": vector, "limit": limit, "with_payload": true }));
        let hits: QueryHits = read_result(send_checked(request, "query points").await?).await?;

        Ok(hits
            .into_points()
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    /// Look up one point. A 404 from Qdrant is `Ok(None)`.
    pub async fn get_point(
        &self,
        collection_name: &str,
        id: &str,
    ) -> Result<Option<StoredPoint>, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}/points/{id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let point: Option<RawPoint> = read_result(check_status(response, "get point").await?).await?;
        Ok(point.and_then(|point| point.into_stored(|| Some(id.to_string()))))
    }

    /// Delete points by id and wait until Qdrant has applied it.
    pub async fn delete_points(
        &self,
        collection_name: &str,
        ids: &[String],
    ) -> Result<(), QdrantError> {
        let request = self
            .request(Method::POST, &format!("collections/{collection_name}/points/delete"))
            .query(&[("wait", true)])
            .json(&json!({ "points": ids }));
        send_checked(request, "delete points").await?;
        tracing::debug!(collection = collection_name, points = ids.len(), "Points deleted");
        Ok(())
    }

    /// Exact point count of the collection.
    pub async fn count_points(&self, collection_name: &str) -> Result<u64, QdrantError> {
        let request = self
            .request(Method::POST, &format!("collections/{collection_name}/points/count"))
            .json(&json!({ "exact": true }));
        let PointCount { count } = read_result(send_checked(request, "count points").await?).await?;
        Ok(count)
    }

    /// Whether the collection exists. Also serves as the reachability probe.
    pub async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response, "describe collection").await?;
        Ok(true)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format_endpoint(&self.base_url, path));
        match &self.api_key {
            Some(api_key) => request.header("api-key", api_key),
            None => request,
        }
    }
}

async fn send_checked(request: RequestBuilder, operation: &str) -> Result<Response, QdrantError> {
    check_status(request.send().await?, operation).await
}

/// Turn a non-success response into [`QdrantError::UnexpectedStatus`], logging it once here.
pub(crate) async fn check_status(response: Response, operation: &str) -> Result<Response, QdrantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let error = QdrantError::UnexpectedStatus { status, body };
    tracing::error!(operation, error = %error, "Qdrant request failed");
    Err(error)
}

pub(crate) async fn read_result<T: DeserializeOwned>(response: Response) -> Result<T, QdrantError> {
    let Envelope { result } = response.json::<Envelope<T>>().await?;
    Ok(result)
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    if parsed.cannot_be_a_base() {
        return Err(format!("{url} cannot be used as a base URL"));
    }
    let trimmed = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&trimmed);
    Ok(parsed.to_string())
}

pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
pub(crate) fn test_service(base_url: String) -> QdrantService {
    QdrantService {
        client: Client::new(),
        base_url,
        api_key: None,
    }
}
