//! Paginated scroll over a whole collection, exposed as a `Stream`.

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Value, json};

use super::client::{QdrantService, check_status, read_result};
use super::types::{QdrantError, ScrollPage, StoredPoint};

const SCROLL_PAGE_SIZE: usize = 256;

/// Yield every point of `collection` with its payload, following `next_page_offset` until
/// Qdrant reports the last page. Vectors are not fetched.
pub fn stream_points<'a>(
    service: &'a QdrantService,
    collection: &'a str,
) -> impl Stream<Item = Result<StoredPoint, QdrantError>> + 'a {
    try_stream! {
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "with_payload": true,
                "with_vector": false,
                "limit": SCROLL_PAGE_SIZE,
            });
            if let Some(next) = offset.take() {
                body["offset"] = next;
            }

            let response = service
                .request(Method::POST, &format!("collections/{collection}/points/scroll"))
                .json(&body)
                .send()
                .await?;
            let page: ScrollPage = read_result(check_status(response, "scroll points").await?).await?;

            for point in page.points {
                if let Some(point) = point.into_stored(|| None) {
                    yield point;
                }
            }

            match page.next_page_offset {
                Some(Value::Null) | None => break,
                Some(next) => offset = Some(next),
            }
        }
    }
}
