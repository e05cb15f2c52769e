//! Module loading.
//!
//! # Responsibilities
//! - Decide which files are loadable modules (by extension)
//! - Load a module's exported value
//!
//! # Design Decisions
//! - Unsupported file types yield `Ok(None)`, never an error
//! - Read and parse failures are errors scoped to that one file
//! - The filesystem loader reads JSON and TOML; hosts with other module
//!   formats implement [`ModuleLoader`] themselves

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::rules::Export;

/// Errors produced while loading a module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads a file's exported value.
pub trait ModuleLoader: Send + Sync {
    /// Whether files at `path` are modules this loader understands.
    fn supports(&self, path: &Path) -> bool;

    /// Load the module at `path`. `Ok(None)` means the type is unsupported.
    fn load(&self, path: &Path) -> Result<Option<Export>, LoadError>;
}

/// Loads `.json` and `.toml` files as static exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModuleLoader;

impl FsModuleLoader {
    pub const EXTENSIONS: [&'static str; 2] = ["json", "toml"];
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

impl ModuleLoader for FsModuleLoader {
    fn supports(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| Self::EXTENSIONS.contains(&ext))
    }

    fn load(&self, path: &Path) -> Result<Option<Export>, LoadError> {
        let ext = match extension(path) {
            Some(ext) if Self::EXTENSIONS.contains(&ext) => ext,
            _ => return Ok(None),
        };

        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let value = if ext == "toml" {
            let parsed: toml::Value = toml::from_str(&content).map_err(|source| LoadError::Toml {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::to_value(parsed).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };

        Ok(Some(Export::Value(value)))
    }
}

/// Serves programmatic exports keyed by path, falling back to another loader.
///
/// Hosts use this to attach callables (`Export::Callable`) or prebuilt rules to
/// files on disk, overriding whatever the file itself contains.
pub struct MemoryLoader {
    exports: HashMap<PathBuf, Export>,
    fallback: Option<Box<dyn ModuleLoader>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            exports: HashMap::new(),
            fallback: None,
        }
    }

    /// Delegate paths without a registered export to `fallback`.
    pub fn with_fallback(mut self, fallback: impl ModuleLoader + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, export: Export) {
        self.exports.insert(path.into(), export);
    }

    pub fn with_export(mut self, path: impl Into<PathBuf>, export: Export) -> Self {
        self.insert(path, export);
        self
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for MemoryLoader {
    fn supports(&self, path: &Path) -> bool {
        self.exports.contains_key(path)
            || self.fallback.as_ref().is_some_and(|f| f.supports(path))
    }

    fn load(&self, path: &Path) -> Result<Option<Export>, LoadError> {
        if let Some(export) = self.exports.get(path) {
            return Ok(Some(export.clone()));
        }
        match &self.fallback {
            Some(fallback) => fallback.load(path),
            None => Ok(None),
        }
    }
}
