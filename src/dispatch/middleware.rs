//! Staged middleware and the lane interpreter.
//!
//! # Responsibilities
//! - Define the middleware contract (`handle(req, next)`)
//! - Flatten the pre / normal / post lanes into one ordered chain
//! - Run that chain by threading a continuation index down to the handler
//!
//! # Design Decisions
//! - Lane order is data, not callback nesting: `pre ++ normal ++ reverse(post)`
//! - Pre lane is outermost, so its entry code runs before any simulated delay
//! - Post lane sits innermost in reverse, so post entries observe the handler
//!   result in declaration order and can still rewrite status and headers
//! - Errors travel back up the chain untouched; any layer may catch them

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::dispatch::handler::{Handler, HandlerError};
use crate::dispatch::pipeline::DispatchState;
use crate::dispatch::request::{MockRequest, MockResponse};

/// Response header written by [`Timing`].
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Lane a middleware entry runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    #[default]
    Normal,
    Post,
}

/// A layer around route handlers.
///
/// Post-lane middleware should call `next.run(req)` first and only then
/// inspect or rewrite the response.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        req: &mut MockRequest,
        next: Next<'_>,
    ) -> Result<MockResponse, HandlerError>;
}

/// The innermost step: simulated delay, then the handler.
pub(crate) struct Endpoint<'a> {
    pub handler: &'a dyn Handler,
    pub delay: Duration,
    pub initial: &'a MockResponse,
}

impl Endpoint<'_> {
    async fn invoke(&self, req: &mut MockRequest) -> Result<MockResponse, HandlerError> {
        if !self.delay.is_zero() {
            tracing::trace!(delay_ms = self.delay.as_millis() as u64, "Simulating latency");
            tokio::time::sleep(self.delay).await;
        }
        DispatchState::RunningHandler.enter();
        let mut res = self.initial.clone();
        self.handler.call(req, &mut res).await?;
        DispatchState::RunningPost.enter();
        Ok(res)
    }
}

/// Continuation handed to each middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    index: usize,
    endpoint: &'a Endpoint<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a Endpoint<'a>) -> Self {
        Self {
            chain,
            index: 0,
            endpoint,
        }
    }

    /// Run the rest of the chain.
    pub async fn run(self, req: &mut MockRequest) -> Result<MockResponse, HandlerError> {
        match self.chain.get(self.index) {
            Some(layer) => {
                let next = Next {
                    index: self.index + 1,
                    ..self
                };
                layer.handle(req, next).await
            }
            None => self.endpoint.invoke(req).await,
        }
    }
}

/// Middleware of one route, split by lane.
#[derive(Clone, Default)]
pub struct Lanes {
    pub pre: Vec<Arc<dyn Middleware>>,
    pub normal: Vec<Arc<dyn Middleware>>,
    pub post: Vec<Arc<dyn Middleware>>,
}

impl Lanes {
    pub fn push(&mut self, phase: Phase, middleware: Arc<dyn Middleware>) {
        match phase {
            Phase::Pre => self.pre.push(middleware),
            Phase::Normal => self.normal.push(middleware),
            Phase::Post => self.post.push(middleware),
        }
    }

    /// Flatten into execution order.
    pub fn chain(&self) -> Vec<Arc<dyn Middleware>> {
        self.pre
            .iter()
            .chain(self.normal.iter())
            .chain(self.post.iter().rev())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.normal.len() + self.post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Lanes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lanes")
            .field("pre", &self.pre.len())
            .field("normal", &self.normal.len())
            .field("post", &self.post.len())
            .finish()
    }
}

/// Measures time from pre-lane entry to response. Registered as `timing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timing;

#[async_trait]
impl Middleware for Timing {
    async fn handle(
        &self,
        req: &mut MockRequest,
        next: Next<'_>,
    ) -> Result<MockResponse, HandlerError> {
        let start = Instant::now();
        let mut res = next.run(req).await?;
        let elapsed = start.elapsed().as_millis();
        if let Ok(value) = HeaderValue::from_str(&format!("{elapsed}ms")) {
            res.headers.insert(X_RESPONSE_TIME, value);
        }
        Ok(res)
    }
}

/// Turns handler errors into a 500 JSON response. Registered as `catch-errors`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchErrors;

#[async_trait]
impl Middleware for CatchErrors {
    async fn handle(
        &self,
        req: &mut MockRequest,
        next: Next<'_>,
    ) -> Result<MockResponse, HandlerError> {
        match next.run(req).await {
            Ok(res) => Ok(res),
            Err(e) => {
                tracing::warn!(path = %req.path, error = %e, "Handler error caught by middleware");
                Ok(MockResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e.to_string() }),
                ))
            }
        }
    }
}

/// Adds permissive CORS headers. Registered as `cors`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cors;

#[async_trait]
impl Middleware for Cors {
    async fn handle(
        &self,
        req: &mut MockRequest,
        next: Next<'_>,
    ) -> Result<MockResponse, HandlerError> {
        let mut res = next.run(req).await?;
        res.headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        res.headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        );
        res.headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS"),
        );
        Ok(res)
    }
}
