//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! scan / publish / dispatch
//!     → logging.rs (tracing events: diagnostics, swaps, matched routes)
//!     → metrics.rs (request counts and latency, scan and publish gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Every HTTP log line carries the request ID via `TraceLayer`
//! - Recording without an installed exporter is a no-op

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
