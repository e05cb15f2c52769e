//! Request handling and transformation.
//!
//! # Responsibilities
//! - Tag every request with an `x-request-id` (UUID v4 unless the client sent one)
//! - Buffer the body within the configured limit
//! - Convert the axum request into a host-independent [`MockRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body limit applies while buffering, after the layer-level check

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::dispatch::MockRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns a request ID to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Body exceeded the limit or could not be read.
#[derive(Debug, thiserror::Error)]
#[error("request body rejected: {0}")]
pub struct BodyError(#[from] axum::Error);

/// Buffer `request` into a [`MockRequest`].
pub async fn into_mock_request(
    request: Request<Body>,
    limit: usize,
) -> Result<MockRequest, BodyError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, limit).await?;

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let mut mock = MockRequest::new(parts.method, uri).with_body(body);
    mock.headers = parts.headers;
    Ok(mock)
}
