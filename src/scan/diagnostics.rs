//! Structured build-time diagnostics.
//!
//! Every skipped file and every failed rule lands here and in the log. Nothing
//! in this list aborts a scan.

use std::fmt;

use axum::http::Method;
use thiserror::Error;

/// Why a file was left out without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Disabled,
    Excluded,
    Ignored,
    InvalidRoute,
    Unsupported,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::Excluded => "excluded",
            SkipReason::Ignored => "ignored",
            SkipReason::InvalidRoute => "invalid-route",
            SkipReason::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File- or rule-scoped build failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid route template: {0}")]
    InvalidTemplate(String),

    #[error("no HTTP method in file name or rule")]
    AmbiguousMethod,

    #[error("duplicate route {method} {template}, first declared in {first}")]
    DuplicateRoute {
        method: Method,
        template: String,
        first: String,
    },

    #[error("config {dir} failed to load: {reason}")]
    ConfigLoad { dir: String, reason: String },

    #[error("unrecognized rule shape: {0}")]
    RuleShape(String),

    #[error("module failed to load: {0}")]
    ModuleLoad(String),

    #[error("directory could not be read: {0}")]
    Unreadable(String),
}

impl BuildError {
    /// Stable code for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::InvalidTemplate(_) => "invalid-template",
            BuildError::AmbiguousMethod => "ambiguous-method",
            BuildError::DuplicateRoute { .. } => "duplicate-route",
            BuildError::ConfigLoad { .. } => "config-load",
            BuildError::RuleShape(_) => "rule-shape",
            BuildError::ModuleLoad(_) => "module-load",
            BuildError::Unreadable(_) => "unreadable",
        }
    }

    /// Template and method problems also count as an `invalid-route` skip.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            BuildError::InvalidTemplate(_) | BuildError::AmbiguousMethod => {
                Some(SkipReason::InvalidRoute)
            }
            _ => None,
        }
    }
}

/// One reported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Skipped { path: String, reason: SkipReason },
    Failed { path: String, error: BuildError },
}

impl Diagnostic {
    pub fn path(&self) -> &str {
        match self {
            Diagnostic::Skipped { path, .. } | Diagnostic::Failed { path, .. } => path,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::Skipped { reason, .. } => reason.as_str(),
            Diagnostic::Failed { error, .. } => error.code(),
        }
    }

    /// The skip reason this entry carries. Template and method failures report
    /// `invalid-route` here alongside their own error code.
    pub fn reason(&self) -> Option<SkipReason> {
        match self {
            Diagnostic::Skipped { reason, .. } => Some(*reason),
            Diagnostic::Failed { error, .. } => error.skip_reason(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Failed { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Skipped { path, reason } => write!(f, "{path}: skipped ({reason})"),
            Diagnostic::Failed { path, error } => write!(f, "{path}: {error}"),
        }
    }
}

/// Ordered diagnostic list for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(&mut self, path: impl Into<String>, reason: SkipReason) {
        let path = path.into();
        match reason {
            SkipReason::Unsupported | SkipReason::Ignored => {
                tracing::debug!(path = %path, reason = %reason, "File skipped")
            }
            _ => tracing::info!(path = %path, reason = %reason, "File skipped"),
        }
        self.entries.push(Diagnostic::Skipped { path, reason });
    }

    pub fn fail(&mut self, path: impl Into<String>, error: BuildError) {
        let path = path.into();
        match error.skip_reason() {
            Some(reason) => {
                tracing::warn!(path = %path, reason = %reason, error = %error, "File skipped")
            }
            None => {
                tracing::warn!(path = %path, code = error.code(), error = %error, "Route skipped")
            }
        }
        self.entries.push(Diagnostic::Failed { path, error });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics reported for one path.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| d.path() == path)
    }
}
