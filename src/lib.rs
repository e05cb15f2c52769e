//! Route-mock library: turns a directory tree of handler definitions into a
//! deterministic, versioned route manifest and serves it.

// Build time
pub mod manifest;
pub mod routing;
pub mod rules;
pub mod scan;

// Serve time
pub mod dispatch;
pub mod http;
pub mod watch;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::MockConfig;
pub use dispatch::{Pipeline, Registry};
pub use http::MockServer;
pub use lifecycle::Shutdown;
pub use manifest::{Manifest, ManifestStore};
pub use scan::{ScanOptions, Scanner};
