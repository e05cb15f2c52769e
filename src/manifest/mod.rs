//! Manifest subsystem.
//!
//! # Data Flow
//! ```text
//! Build time:
//!     normalized rules (scan order)
//!     → builder.rs (dedupe enabled (method, template), sort by specificity)
//!     → format.rs (versioned, serializable Manifest)
//!
//! Serve time:
//!     Manifest + Registry
//!     → dispatch::Pipeline::compile
//!     → store.rs (atomic snapshot swap)
//! ```
//!
//! # Design Decisions
//! - A manifest is never mutated after publication; rebuilds replace it wholesale
//! - Cached manifests carry a format version checked before use

pub mod builder;
pub mod format;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use builder::ManifestBuilder;
pub use format::{ChainEntry, HandlerRef, Manifest, MiddlewareRef, RouteRule, MANIFEST_VERSION};
pub use store::ManifestStore;

/// Errors reading, writing or compiling a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to access manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("manifest version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("route {route} references unknown handler `{name}`")]
    UnresolvedHandler { route: String, name: String },

    #[error("route {route} references unknown middleware `{name}`")]
    UnresolvedMiddleware { route: String, name: String },

    #[error("route {route} has invalid status {status}")]
    InvalidStatus { route: String, status: u16 },

    #[error("route {route} has invalid header `{name}`")]
    InvalidHeader { route: String, name: String },
}
