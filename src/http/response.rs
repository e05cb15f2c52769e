//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a [`MockResponse`] into an axum response
//! - Shape the host's own answers (404 for unmatched, 500 for handler errors)
//!
//! # Design Decisions
//! - An explicit `content-type` from the rule or handler always wins
//! - Host-generated errors are JSON so clients parse one format

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::dispatch::{HandlerError, MockResponse};

pub fn into_response(res: MockResponse) -> Response {
    let (bytes, natural_type) = res.encode_body();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = res.status;
    *response.headers_mut() = res.headers;
    if let Some(content_type) = natural_type {
        if !response.headers().contains_key(CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
    response
}

pub fn not_found(method: &Method, path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "no mock route matched",
            "method": method.as_str(),
            "path": path,
        })),
    )
        .into_response()
}

pub fn handler_error(error: &HandlerError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.to_string() })),
    )
        .into_response()
}

pub fn payload_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({ "error": "request body too large" })),
    )
        .into_response()
}
