//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that glob patterns and socket addresses parse
//! - Validate value ranges (body limit > 0, non-empty roots)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MockConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MockConfig;

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("scan.roots must list at least one directory")]
    NoRoots,

    #[error("invalid glob pattern `{pattern}` in scan.{field}: {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("scan.ignore_prefixes must not contain an empty prefix")]
    EmptyIgnorePrefix,

    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("server.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.scan.roots.is_empty() {
        errors.push(ValidationError::NoRoots);
    }

    let pattern_fields = [
        ("include", &config.scan.include),
        ("exclude", &config.scan.exclude),
    ];
    for (field, patterns) in pattern_fields {
        for pattern in patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError::InvalidPattern {
                    field,
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                });
            }
        }
    }

    if config.scan.ignore_prefixes.iter().any(String::is_empty) {
        errors.push(ValidationError::EmptyIgnorePrefix);
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MockConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = MockConfig::default();
        config.scan.roots.clear();
        config.scan.exclude.push("[".to_string());
        config.scan.ignore_prefixes.push(String::new());
        config.server.bind_address = "nowhere".to_string();
        config.server.max_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::NoRoots));
        assert!(errors.contains(&ValidationError::ZeroBodyLimit));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = MockConfig::default();
        config.observability.metrics_address = "bad".to_string();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
