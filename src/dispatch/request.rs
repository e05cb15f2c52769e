//! Host-independent request and response types.
//!
//! Host adapters translate their native request into a [`MockRequest`] and a
//! [`MockResponse`] back into their native response; nothing in between knows
//! which host is running.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dispatch::handler::HandlerError;
use crate::routing::PathParams;

/// An incoming request as seen by middleware and handlers.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Filled in by the pipeline once a route matched.
    pub params: PathParams,
}

impl MockRequest {
    /// Build a request from a method and a path with optional query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        Self {
            method,
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: PathParams::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Response payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResponseBody::Empty,
            Value::String(text) => ResponseBody::Text(text),
            other => ResponseBody::Json(other),
        }
    }
}

/// A response under construction. Headers stay mutable until the host writes it.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn json(status: StatusCode, value: Value) -> Self {
        Self {
            body: ResponseBody::Json(value),
            ..Self::new(status)
        }
    }

    pub fn set_body(&mut self, body: impl Into<ResponseBody>) {
        self.body = body.into();
    }

    /// Serialize the body, returning the bytes and the content type to use
    /// when none was set explicitly.
    pub fn encode_body(&self) -> (Vec<u8>, Option<&'static str>) {
        match &self.body {
            ResponseBody::Empty => (Vec::new(), None),
            ResponseBody::Text(text) => {
                (text.clone().into_bytes(), Some("text/plain; charset=utf-8"))
            }
            ResponseBody::Json(value) => {
                (value.to_string().into_bytes(), Some("application/json"))
            }
        }
    }

    /// Content type header, falling back to the body's natural type.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| self.encode_body().1.map(str::to_string))
    }
}
