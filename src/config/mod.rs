//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MockConfig (validated, immutable)
//!     → scan options, server settings, logging setup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the mock tree reloads, this file does not
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LogFormat, ManifestConfig, MockConfig, NotFoundMode, ObservabilityConfig, ScanConfig,
    ServerConfig, WatchConfig,
};
pub use validation::{validate_config, ValidationError};
