//! Route handlers.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::dispatch::request::{MockRequest, MockResponse};

/// Error raised while running a handler or middleware.
///
/// The pipeline never swallows it; middleware may catch it, otherwise it
/// reaches the host adapter.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        HandlerError::Failed(message.to_string())
    }
}

/// User-supplied route logic.
///
/// `res` arrives pre-filled with the rule's status and headers.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: &MockRequest, res: &mut MockResponse) -> Result<(), HandlerError>;
}

/// Serves a fixed value.
#[derive(Debug, Clone)]
pub struct StaticHandler(pub Value);

#[async_trait]
impl Handler for StaticHandler {
    async fn call(&self, _req: &MockRequest, res: &mut MockResponse) -> Result<(), HandlerError> {
        res.set_body(self.0.clone());
        Ok(())
    }
}

/// Adapts a synchronous closure returning a body value.
pub struct FnHandler<F>(F);

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&MockRequest) -> Result<Value, HandlerError> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&MockRequest) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn call(&self, req: &MockRequest, res: &mut MockResponse) -> Result<(), HandlerError> {
        let body = (self.0)(req)?;
        res.set_body(body);
        Ok(())
    }
}

/// Reflects the request back as JSON. Registered as `echo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, req: &MockRequest, res: &mut MockResponse) -> Result<(), HandlerError> {
        let body = if req.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&req.body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&req.body).into_owned()))
        };
        res.set_body(json!({
            "method": req.method.as_str(),
            "path": req.path,
            "params": req.params,
            "query": req.query,
            "body": body,
        }));
        Ok(())
    }
}
