//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router that serves the current manifest
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Offer the same dispatch as a layer for an existing application
//! - Bind server to listener and shut down gracefully

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::{self as axum_middleware, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{NotFoundMode, ServerConfig};
use crate::dispatch::Dispatch;
use crate::http::request::{
    into_mock_request, propagate_request_id_layer, request_id, set_request_id_layer,
};
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::manifest::ManifestStore;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: ManifestStore,
    pub max_body_bytes: usize,
}

/// Standalone HTTP server for a mock tree.
pub struct MockServer {
    router: Router,
    config: ServerConfig,
}

impl MockServer {
    pub fn new(store: ManifestStore, config: ServerConfig) -> Self {
        let state = AppState {
            store,
            max_body_bytes: config.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let mut router = match config.not_found {
            NotFoundMode::Respond => Router::new().fallback(mock_handler).with_state(state),
            NotFoundMode::Pass => Router::new()
                .fallback(|| async { StatusCode::NOT_FOUND })
                .layer(axum_middleware::from_fn_with_state(state, pass_through)),
        };

        router = router.layer(RequestBodyLimitLayer::new(config.max_body_bytes));
        if config.request_timeout_secs > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )));
        }
        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` triggers.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wrap an existing application: matched requests are answered from the
/// manifest, everything else reaches the inner router untouched.
pub fn mock_layer<S>(router: Router<S>, store: ManifestStore, max_body_bytes: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = AppState {
        store,
        max_body_bytes,
    };
    router.layer(axum_middleware::from_fn_with_state(state, pass_through))
}

/// Fallback handler of the standalone server.
async fn mock_handler(State(state): State<AppState>, request: Request) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let req = match into_mock_request(request, state.max_body_bytes).await {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            return finish(&method, started, false, response::payload_too_large());
        }
    };

    let pipeline = state.store.snapshot();
    match pipeline.dispatch(req).await {
        Ok(Dispatch::Matched(res)) => {
            finish(&method, started, true, response::into_response(res))
        }
        Ok(Dispatch::NotFound) => {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "No mock route matched"
            );
            finish(&method, started, false, response::not_found(&method, &path))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "Handler failed"
            );
            finish(&method, started, true, response::handler_error(&e))
        }
    }
}

/// Pass-through variant: only matched requests have their body consumed.
async fn pass_through(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let pipeline = state.store.snapshot();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(matched) = pipeline.find(&method, &path) else {
        return next.run(request).await;
    };

    let request_id = request_id(request.headers()).to_string();
    let req = match into_mock_request(request, state.max_body_bytes).await {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            return finish(&method, started, true, response::payload_too_large());
        }
    };

    match pipeline.run_matched(matched.route, matched.params, req).await {
        Ok(res) => finish(&method, started, true, response::into_response(res)),
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "Handler failed"
            );
            finish(&method, started, true, response::handler_error(&e))
        }
    }
}

fn finish(method: &Method, started: Instant, matched: bool, response: Response) -> Response {
    metrics::record_request(
        method.as_str(),
        response.status().as_u16(),
        matched,
        started.elapsed(),
    );
    response
}
