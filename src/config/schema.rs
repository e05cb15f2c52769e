//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mock server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the mock server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    /// Which directories to scan and how to filter them.
    pub scan: ScanConfig,

    /// Standalone server settings.
    pub server: ServerConfig,

    /// Hot reload settings.
    pub watch: WatchConfig,

    /// Manifest output settings.
    pub manifest: ManifestConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Scan roots and filters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Roots walked in this order.
    pub roots: Vec<PathBuf>,

    /// Glob patterns; when non-empty a route file must match one.
    pub include: Vec<String>,

    /// Glob patterns; a matching route file is skipped.
    pub exclude: Vec<String>,

    /// Path segments starting with any of these are ignored.
    pub ignore_prefixes: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("mock")],
            include: Vec::new(),
            exclude: Vec::new(),
            ignore_prefixes: vec![".".to_string(), "_".to_string()],
        }
    }
}

/// What the host does with requests no route matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundMode {
    /// Answer with a 404 JSON body.
    #[default]
    Respond,
    /// Hand the request to the wrapped application.
    Pass,
}

/// Standalone server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    pub not_found: NotFoundMode,

    /// Per-request timeout; 0 disables it.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            not_found: NotFoundMode::Respond,
            request_timeout_secs: 0,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Hot reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,

    /// Quiet period before a burst of file events triggers one rescan.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 150,
        }
    }
}

/// Manifest output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Where `build` writes the manifest.
    pub output: PathBuf,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("mock-manifest.json"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: MockConfig = toml::from_str("").unwrap();
        assert_eq!(config.scan.roots, vec![PathBuf::from("mock")]);
        assert_eq!(config.scan.ignore_prefixes, vec![".", "_"]);
        assert_eq!(config.server.not_found, NotFoundMode::Respond);
        assert!(config.watch.enabled);
    }

    #[test]
    fn test_parses_sections() {
        let raw = r#"
            [scan]
            roots = ["api", "fixtures"]
            exclude = ["**/*.draft.json"]

            [server]
            bind_address = "0.0.0.0:4000"
            not_found = "pass"

            [observability]
            log_format = "json"
        "#;
        let config: MockConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.scan.roots.len(), 2);
        assert_eq!(config.server.not_found, NotFoundMode::Pass);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
