//! Serve-time request dispatch.
//!
//! # Data Flow
//! ```text
//! Manifest + Registry
//!     → pipeline.rs (compile: resolve names, build lanes)
//!
//! Per request:
//!     MockRequest
//!     → pipeline.rs (match, most specific first)
//!     → middleware.rs (pre → normal → [delay → handler] → post)
//!     → MockResponse | NotFound | HandlerError
//! ```
//!
//! # Design Decisions
//! - Host-independent: axum is only one adapter over `MockRequest`/`MockResponse`
//! - Callables are looked up by name in the [`Registry`], never serialized

pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod registry;
pub mod request;

pub use handler::{handler_fn, EchoHandler, FnHandler, Handler, HandlerError, StaticHandler};
pub use middleware::{CatchErrors, Cors, Lanes, Middleware, Next, Phase, Timing, X_RESPONSE_TIME};
pub use pipeline::{CompiledRoute, Dispatch, DispatchState, Pipeline};
pub use registry::Registry;
pub use request::{MockRequest, MockResponse, ResponseBody};
