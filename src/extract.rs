//! Plain-text extraction for uploaded PDF documents.

use thiserror::Error;

/// MIME type accepted by the upload endpoint.
pub const MIME_PDF: &str = "application/pdf";

/// Errors raised while extracting text from an upload.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF could not be parsed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The blocking extraction task did not complete.
    #[error("PDF extraction task failed: {0}")]
    Task(String),
}

/// Extract the text of every non-empty page, one page per line.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|error| ExtractError::Pdf(error.to_string()))?;
    let total = pages.len();
    let kept: Vec<String> = pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect();
    tracing::debug!(pages = total, with_text = kept.len(), "Extracted PDF pages");
    Ok(kept.join("\n"))
}

/// Run [`extract_pdf_text`] on the blocking pool and flatten the result to a single line.
pub async fn extract_upload_text(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|error| ExtractError::Task(error.to_string()))??;
    Ok(collapse_newlines(&text))
}

/// Replace line breaks with spaces and trim the result.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}
