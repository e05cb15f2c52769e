//! Build-time scanning.
//!
//! # Data Flow
//! ```text
//! scan roots
//!     → scanner.rs (deterministic walk, filters)
//!     → chain.rs (merged index.config.* per directory)
//!     → loader.rs (ModuleLoader: file → Export)
//!     → rules::normalize (Export → RouteRule*)
//!     → manifest::ManifestBuilder
//!     → ScanReport { manifest, diagnostics }
//! ```
//!
//! # Design Decisions
//! - Single-threaded and synchronous over file I/O
//! - Every problem is scoped to a file or a subtree and reported, never thrown

pub mod chain;
pub mod diagnostics;
pub mod loader;
pub mod scanner;

use std::path::Path;

pub use chain::{ChainResolver, DirectoryConfig, MiddlewareEntry, ResolvedConfig};
pub use diagnostics::{BuildError, Diagnostic, Diagnostics, SkipReason};
pub use loader::{FsModuleLoader, LoadError, MemoryLoader, ModuleLoader};
pub use scanner::{ScanOptions, ScanReport, Scanner};

/// Render a path with `/` separators on every platform.
pub(crate) fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
