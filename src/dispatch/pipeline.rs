//! Request dispatch against a compiled manifest.
//!
//! # Responsibilities
//! - Resolve every handler and middleware name of a manifest once, up front
//! - Match a request to the first enabled, most specific route
//! - Run the route's lanes and handler, producing a response or `NotFound`
//!
//! # Data Flow
//! ```text
//! MockRequest
//!     → Matching (router::find_route over the sorted table)
//!     → ResolvingMiddleware (precomputed chain: pre ++ normal ++ reverse(post))
//!     → RunningPre → delay → RunningHandler → RunningPost
//!     → Responding (MockResponse)
//! ```
//!
//! # Design Decisions
//! - A manifest that names unknown modules fails to compile; nothing fails later
//!   at request time
//! - Disabled rules stay in the manifest but are not compiled
//! - Handler errors are returned, never converted here

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};

use crate::dispatch::handler::{Handler, HandlerError, StaticHandler};
use crate::dispatch::middleware::{Endpoint, Lanes, Middleware, Next};
use crate::dispatch::registry::Registry;
use crate::dispatch::request::{MockRequest, MockResponse};
use crate::manifest::format::{HandlerRef, Manifest, RouteRule};
use crate::manifest::ManifestError;
use crate::routing::{find_route, PathParams, Routable, RouteMatch, Template};

/// Stages a request moves through, as reported in trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Matching,
    ResolvingMiddleware,
    RunningPre,
    RunningHandler,
    RunningPost,
    Responding,
    NotFound,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Matching => "matching",
            DispatchState::ResolvingMiddleware => "resolving-middleware",
            DispatchState::RunningPre => "running-pre",
            DispatchState::RunningHandler => "running-handler",
            DispatchState::RunningPost => "running-post",
            DispatchState::Responding => "responding",
            DispatchState::NotFound => "not-found",
        }
    }

    pub(crate) fn enter(self) {
        tracing::trace!(state = self.as_str(), "Dispatch state");
    }
}

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch {
    Matched(MockResponse),
    /// No enabled route matched; the host decides between 404 and pass-through.
    NotFound,
}

/// A route with its handler and middleware resolved.
pub struct CompiledRoute {
    rule: RouteRule,
    handler: Arc<dyn Handler>,
    lanes: Lanes,
    chain: Vec<Arc<dyn Middleware>>,
    initial: MockResponse,
}

impl CompiledRoute {
    fn compile(rule: &RouteRule, registry: &Registry) -> Result<Self, ManifestError> {
        let route = format!("{} {}", rule.method, rule.template);

        let handler: Arc<dyn Handler> = match &rule.handler {
            HandlerRef::Static { body } => Arc::new(StaticHandler(body.clone())),
            HandlerRef::Module { module_ref } => {
                registry
                    .handler(module_ref)
                    .ok_or_else(|| ManifestError::UnresolvedHandler {
                        route: route.clone(),
                        name: module_ref.clone(),
                    })?
            }
        };

        let mut lanes = Lanes::default();
        for entry in &rule.middleware {
            let middleware =
                registry
                    .middleware(&entry.module_ref)
                    .ok_or_else(|| ManifestError::UnresolvedMiddleware {
                        route: route.clone(),
                        name: entry.module_ref.clone(),
                    })?;
            lanes.push(entry.phase, middleware);
        }

        let status = StatusCode::from_u16(rule.status).map_err(|_| ManifestError::InvalidStatus {
            route: route.clone(),
            status: rule.status,
        })?;
        let mut initial = MockResponse::new(status);
        for (name, value) in &rule.headers {
            let invalid = || ManifestError::InvalidHeader {
                route: route.clone(),
                name: name.clone(),
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            initial.headers.insert(name, value);
        }

        Ok(Self {
            rule: rule.clone(),
            handler,
            chain: lanes.chain(),
            lanes,
            initial,
        })
    }
}

impl Routable for CompiledRoute {
    fn method(&self) -> &Method {
        &self.rule.method
    }

    fn template(&self) -> &Template {
        &self.rule.template
    }

    fn is_enabled(&self) -> bool {
        self.rule.enabled
    }
}

impl std::fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("method", &self.rule.method)
            .field("template", &self.rule.template.to_string())
            .field("lanes", &self.lanes)
            .finish()
    }
}

/// An executable manifest.
#[derive(Debug)]
pub struct Pipeline {
    manifest: Manifest,
    routes: Vec<CompiledRoute>,
}

impl Pipeline {
    /// Resolve a manifest against a registry without rescanning anything.
    pub fn compile(manifest: Manifest, registry: &Registry) -> Result<Self, ManifestError> {
        let routes = manifest
            .active_routes()
            .map(|rule| CompiledRoute::compile(rule, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { manifest, routes })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    /// Match without running anything.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, CompiledRoute>> {
        DispatchState::Matching.enter();
        find_route(&self.routes, method, path)
    }

    pub async fn dispatch(&self, req: MockRequest) -> Result<Dispatch, HandlerError> {
        match self.find(&req.method, &req.path) {
            Some(matched) => self
                .run_matched(matched.route, matched.params, req)
                .await
                .map(Dispatch::Matched),
            None => {
                DispatchState::NotFound.enter();
                tracing::debug!(method = %req.method, path = %req.path, "No route matched");
                Ok(Dispatch::NotFound)
            }
        }
    }

    /// Run a route already chosen by [`Pipeline::find`].
    pub async fn run_matched(
        &self,
        route: &CompiledRoute,
        params: PathParams,
        mut req: MockRequest,
    ) -> Result<MockResponse, HandlerError> {
        req.params = params;
        DispatchState::ResolvingMiddleware.enter();
        tracing::debug!(
            method = %route.rule.method,
            template = %route.rule.template,
            middleware = route.lanes.len(),
            "Route matched"
        );

        let endpoint = Endpoint {
            handler: route.handler.as_ref(),
            delay: Duration::from_millis(route.rule.delay),
            initial: &route.initial,
        };
        DispatchState::RunningPre.enter();
        let res = Next::new(&route.chain, &endpoint).run(&mut req).await?;
        DispatchState::Responding.enter();
        Ok(res)
    }
}
