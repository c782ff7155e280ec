//! HTTP surface for the chatbot.
//!
//! The router exposes the chat and document-management endpoints:
//!
//! - `POST /chat` – Answer `{query, session_id?}` from retrieved context. Failures still return
//!   `200` with a fixed apology so chat clients never see a raw error.
//! - `POST /upload` – Multipart PDF upload; text is extracted and stored as one document.
//! - `GET /view-all` – Every stored record with a short preview.
//! - `DELETE /delete/:id` – Remove one stored record; always `200` with `{status, message}`.
//! - `GET /status` – Liveness of the bot and reachability of the vector store.
//! - `POST /documents` – Store raw text documents with optional metadata.
//! - `POST /search` – Nearest records for a query.
//! - `GET /documents/:id` – One stored record.
//! - `DELETE /sessions/:id` – Forget a session's history.
//! - `GET /metrics` – Ingestion and chat counters.

use crate::config::Config;
use crate::documents::{
    Document, DocumentInput, DocumentStoreError, StoredRecord, sanitize::sanitize_filename,
};
use crate::extract::{MIME_PDF, extract_upload_text};
use crate::metrics::MetricsSnapshot;
use crate::orchestrator::ChatbotApi;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Reply sent when a chat turn fails for any reason.
pub const APOLOGY: &str =
    "I apologize, but I'm experiencing some technical difficulties. Please try again.";

const PREVIEW_CHARS: usize = 100;

/// Build the HTTP router exposing the chatbot API surface.
pub fn create_router<S>(service: Arc<S>, config: &Config) -> Router
where
    S: ChatbotApi + 'static,
{
    Router::new()
        .route("/chat", post(chat::<S>))
        .route("/upload", post(upload::<S>))
        .route("/view-all", get(view_all::<S>))
        .route("/delete/:id", delete(delete_document::<S>))
        .route("/status", get(status::<S>))
        .route("/documents", post(add_documents::<S>))
        .route("/documents/:id", get(get_document::<S>))
        .route("/search", post(search::<S>))
        .route("/sessions/:id", delete(clear_session::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(config.upload_max_bytes))
        .layer(cors_layer(config.cors_origins.as_deref()))
        .with_state(service)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let Some(origins) = origins else {
        return layer.allow_origin(Any);
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin = %origin, error = %error, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::debug!(origins = allowed.len(), "Restricting CORS origins");
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

/// Answer a chat turn. Errors are logged and replaced by the apology.
async fn chat<S>(State(service): State<Arc<S>>, Json(request): Json<ChatRequest>) -> Json<ChatResponse>
where
    S: ChatbotApi,
{
    let ChatRequest { query, session_id } = request;
    let response = match service.chat(&query, session_id.as_deref()).await {
        Ok(reply) => reply,
        Err(error) => {
            tracing::error!(error = %error, session_id = ?session_id, "Chat request failed");
            APOLOGY.to_string()
        }
    };
    Json(ChatResponse { response })
}

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    document_ids: Vec<String>,
    chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

/// Accept a single PDF file, extract its text, and store it as one document.
async fn upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: ChatbotApi,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::Validation(format!("Invalid multipart body: {error}")))?
    {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }

        let filename = sanitize_filename(field.file_name().map(str::to_string));
        let content_type = field.content_type().unwrap_or("unknown").to_string();
        tracing::info!(filename = ?filename, content_type = %content_type, "Received upload");
        if content_type != MIME_PDF {
            return Err(ApiError::Validation(format!(
                "Unsupported file type: {content_type}"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::Validation(format!("Invalid multipart body: {error}")))?;
        let text = extract_upload_text(bytes.to_vec())
            .await
            .map_err(|error| ApiError::Internal(format!("File upload failed: {error}")))?;
        if text.is_empty() {
            return Err(ApiError::Validation("No text content found in file".into()));
        }

        let mut document = Document::new(text);
        if let Some(name) = &filename {
            document = document.with_metadata("filename", name.as_str());
        }
        let document_ids = service
            .add_documents(vec![document.into()])
            .await
            .map_err(|error| ApiError::Internal(format!("File upload failed: {error}")))?;
        tracing::info!(filename = ?filename, chunks = document_ids.len(), "Upload stored");

        return Ok(Json(UploadResponse {
            status: "success",
            chunks: document_ids.len(),
            document_ids,
            filename,
        }));
    }

    Err(ApiError::Validation("No file provided".into()))
}

#[derive(Serialize)]
struct PreviewItem {
    id: String,
    preview: String,
}

#[derive(Serialize)]
struct ViewAllResponse {
    status: &'static str,
    documents: Vec<PreviewItem>,
}

/// List every stored record with a short preview of its text.
async fn view_all<S>(State(service): State<Arc<S>>) -> Result<Json<ViewAllResponse>, ApiError>
where
    S: ChatbotApi,
{
    let records = service.retrieve_all_docs().await.map_err(|error| {
        tracing::error!(error = %error, "Failed to list documents");
        ApiError::Internal(format!("Failed to retrieve documents: {error}"))
    })?;

    if records.is_empty() {
        return Ok(Json(ViewAllResponse {
            status: "empty",
            documents: Vec::new(),
        }));
    }

    let documents = records
        .into_iter()
        .map(|record| PreviewItem {
            preview: text_preview(&record.text),
            id: record.id,
        })
        .collect();
    Ok(Json(ViewAllResponse {
        status: "success",
        documents,
    }))
}

fn text_preview(text: &str) -> String {
    if text.is_empty() {
        return "[Empty]".to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head.replace('\n', " "))
}

#[derive(Serialize)]
struct DeleteResponse {
    status: bool,
    message: String,
}

/// Delete one stored record. Always answers `200`.
async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Json<DeleteResponse>
where
    S: ChatbotApi,
{
    let outcome = service.delete_docs(&id).await;
    Json(DeleteResponse {
        status: outcome.success,
        message: outcome.message,
    })
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    bot: bool,
    database: bool,
    timestamp: String,
}

/// Report liveness of the bot and reachability of the vector store.
async fn status<S>(State(service): State<Arc<S>>) -> Json<StatusResponse>
where
    S: ChatbotApi,
{
    let health = service.store_health().await;
    Json(StatusResponse {
        status: "healthy",
        bot: service.ping(),
        database: health.reachable,
        timestamp: format_timestamp(OffsetDateTime::now_utc()),
    })
}

fn format_timestamp(now: OffsetDateTime) -> String {
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Failed to format status timestamp");
        now.to_string()
    })
}

/// Request body for `POST /documents`.
#[derive(Deserialize)]
struct AddDocumentsRequest {
    #[serde(default)]
    documents: Vec<DocumentBody>,
    #[serde(default)]
    texts: Vec<String>,
}

#[derive(Deserialize)]
struct DocumentBody {
    text: String,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct AddDocumentsResponse {
    document_ids: Vec<String>,
    chunks: usize,
}

/// Store raw text documents.
async fn add_documents<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AddDocumentsRequest>,
) -> Result<Json<AddDocumentsResponse>, ApiError>
where
    S: ChatbotApi,
{
    let AddDocumentsRequest { documents, texts } = request;
    let items: Vec<DocumentInput> = documents
        .into_iter()
        .map(|DocumentBody { text, metadata }| Document { text, metadata }.into())
        .chain(texts.into_iter().map(DocumentInput::from))
        .collect();
    if items.is_empty() {
        return Err(ApiError::Validation("No documents provided".into()));
    }

    let document_ids = service.add_documents(items).await?;
    Ok(Json(AddDocumentsResponse {
        chunks: document_ids.len(),
        document_ids,
    }))
}

/// Request body for `POST /search`.
#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<StoredRecord>,
}

/// Return the nearest stored records for a query.
async fn search<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError>
where
    S: ChatbotApi,
{
    let results = service.retrieve_docs(&request.query, request.k).await?;
    Ok(Json(SearchResponse { results }))
}

/// Return one stored record.
async fn get_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<StoredRecord>, ApiError>
where
    S: ChatbotApi,
{
    service
        .retrieve_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document {id} not found")))
}

/// Forget a session's history.
async fn clear_session<S>(State(service): State<Arc<S>>, Path(id): Path<String>) -> Json<Value>
where
    S: ChatbotApi,
{
    let cleared = service.clear_session(&id).await;
    Json(json!({ "cleared": cleared }))
}

/// Return the activity counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ChatbotApi,
{
    Json(service.metrics_snapshot())
}

/// Errors mapped onto HTTP statuses at the router boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or unacceptable request (400).
    #[error("{0}")]
    Validation(String),
    /// Requested record does not exist (404).
    #[error("{0}")]
    NotFound(String),
    /// An upstream dependency failed (502).
    #[error("{0}")]
    Upstream(String),
    /// Request could not be completed (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<DocumentStoreError> for ApiError {
    fn from(error: DocumentStoreError) -> Self {
        tracing::error!(error = %error, "Document store request failed");
        Self::Upstream(error.to_string())
    }
}
