//! Directory configuration chain.
//!
//! # Responsibilities
//! - Find the optional `index.config.<ext>` of every directory from a scan
//!   root down to a file's directory
//! - Merge those configs top-down into one resolved config per file
//! - Cache each directory's outcome for the rest of the scan
//!
//! # Design Decisions
//! - Scalars (status, delay, enabled) override only when explicitly set
//! - Header maps merge key by key (names lowercased), deeper directories win
//! - Middleware lists concatenate in chain order; lanes are split at dispatch
//! - A broken config poisons only the routes beneath its directory

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::middleware::Phase;
use crate::dispatch::registry::Registry;
use crate::manifest::format::{ChainEntry, MiddlewareRef};
use crate::rules::normalize::{validate_headers, validate_status};
use crate::rules::Export;
use crate::scan::diagnostics::BuildError;
use crate::scan::loader::ModuleLoader;
use crate::scan::slash_path;

/// File stem that marks a directory config (`index.config.json`).
pub const CONFIG_STEM: &str = "index.config";

/// Whether `path` names a directory config file.
pub fn is_config_file(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(CONFIG_STEM)
}

/// Settings declared at one directory level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<MiddlewareEntry>,
}

/// A middleware reference inside a directory config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiddlewareEntry {
    #[serde(default)]
    pub phase: Phase,
    pub handler: String,
}

impl DirectoryConfig {
    fn validate(&self, registry: &Registry) -> Result<(), String> {
        if let Some(status) = self.status {
            validate_status(status)?;
        }
        validate_headers(&self.headers)?;
        for entry in &self.middleware {
            if !registry.has_middleware(&entry.handler) {
                return Err(format!("unknown middleware `{}`", entry.handler));
            }
        }
        Ok(())
    }
}

/// The merged view of a config chain for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub headers: BTreeMap<String, String>,
    pub status: Option<u16>,
    pub delay: Option<u64>,
    pub enabled: bool,
    pub middleware: Vec<MiddlewareRef>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            status: None,
            delay: None,
            enabled: true,
            middleware: Vec::new(),
        }
    }
}

impl ResolvedConfig {
    /// Layer a deeper directory's config on top.
    pub fn merge(&mut self, config: &DirectoryConfig) {
        self.headers.extend(
            config
                .headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone())),
        );
        if config.status.is_some() {
            self.status = config.status;
        }
        if config.delay.is_some() {
            self.delay = config.delay;
        }
        if let Some(enabled) = config.enabled {
            self.enabled = enabled;
        }
        self.middleware
            .extend(config.middleware.iter().map(|entry| MiddlewareRef {
                phase: entry.phase,
                module_ref: entry.handler.clone(),
            }));
    }
}

enum DirState {
    Empty,
    Loaded {
        root: PathBuf,
        source: PathBuf,
        config: DirectoryConfig,
    },
    Failed(String),
}

/// Resolves and caches config chains for the duration of one scan.
pub struct ChainResolver<'a> {
    loader: &'a dyn ModuleLoader,
    registry: &'a Registry,
    cache: HashMap<PathBuf, DirState>,
}

impl<'a> ChainResolver<'a> {
    pub fn new(loader: &'a dyn ModuleLoader, registry: &'a Registry) -> Self {
        Self {
            loader,
            registry,
            cache: HashMap::new(),
        }
    }

    /// Resolve the merged config for files in `dir`, which lies under `root`.
    pub fn resolve(&mut self, root: &Path, dir: &Path) -> Result<ResolvedConfig, BuildError> {
        let rel = dir.strip_prefix(root).unwrap_or(Path::new(""));
        let mut current = root.to_path_buf();
        let mut resolved = ResolvedConfig::default();

        self.apply(root, &current, &mut resolved)?;
        for component in rel.components() {
            current.push(component);
            self.apply(root, &current, &mut resolved)?;
        }
        Ok(resolved)
    }

    fn apply(
        &mut self,
        root: &Path,
        dir: &Path,
        resolved: &mut ResolvedConfig,
    ) -> Result<(), BuildError> {
        let (loader, registry) = (self.loader, self.registry);
        let state = self
            .cache
            .entry(dir.to_path_buf())
            .or_insert_with(|| load_dir(loader, registry, root, dir));

        match state {
            DirState::Empty => Ok(()),
            DirState::Loaded { config, .. } => {
                resolved.merge(config);
                Ok(())
            }
            DirState::Failed(reason) => Err(BuildError::ConfigLoad {
                dir: slash_path(dir),
                reason: reason.clone(),
            }),
        }
    }

    /// Every config loaded so far, sorted by root then directory.
    pub fn entries(&self) -> Vec<ChainEntry> {
        let mut entries: Vec<ChainEntry> = self
            .cache
            .iter()
            .filter_map(|(dir, state)| match state {
                DirState::Loaded {
                    root,
                    source,
                    config,
                } => Some(ChainEntry {
                    root: slash_path(root),
                    dir: slash_path(dir.strip_prefix(root).unwrap_or(dir)),
                    source: slash_path(source),
                    config: config.clone(),
                }),
                _ => None,
            })
            .collect();
        entries.sort_by(|a, b| (&a.root, &a.dir).cmp(&(&b.root, &b.dir)));
        entries
    }
}

fn find_config_file(loader: &dyn ModuleLoader, dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_config_file(path) && path.is_file() && loader.supports(path))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn load_dir(loader: &dyn ModuleLoader, registry: &Registry, root: &Path, dir: &Path) -> DirState {
    let Some(source) = find_config_file(loader, dir) else {
        return DirState::Empty;
    };

    let loaded = match loader.load(&source) {
        Ok(Some(Export::Value(value))) => {
            serde_json::from_value::<DirectoryConfig>(value).map_err(|e| e.to_string())
        }
        Ok(Some(_)) => Err("config must export a plain object".to_string()),
        Ok(None) => Err("unsupported config file type".to_string()),
        Err(e) => Err(e.to_string()),
    };

    match loaded.and_then(|config| config.validate(registry).map(|()| config)) {
        Ok(config) => {
            tracing::debug!(source = %source.display(), "Directory config loaded");
            DirState::Loaded {
                root: root.to_path_buf(),
                source,
                config,
            }
        }
        Err(reason) => {
            tracing::warn!(
                source = %source.display(),
                reason = %reason,
                "Directory config failed to load; routes beneath it will be skipped"
            );
            DirState::Failed(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::loader::FsModuleLoader;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_child_overrides_and_headers_merge() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("index.config.json"),
            r#"{"status": 201, "delay": 100, "headers": {"a": "1"},
                "middleware": [{"phase": "pre", "handler": "timing"}]}"#,
        );
        write(
            &root.join("api/index.config.toml"),
            "status = 404\n[headers]\na = \"2\"\nb = \"3\"\n",
        );
        fs::create_dir_all(root.join("api/v1")).unwrap();

        let registry = Registry::with_builtins();
        let mut resolver = ChainResolver::new(&FsModuleLoader, &registry);
        let resolved = resolver.resolve(root, &root.join("api/v1")).unwrap();

        assert_eq!(resolved.status, Some(404));
        assert_eq!(resolved.delay, Some(100));
        assert!(resolved.enabled);
        assert_eq!(resolved.headers["a"], "2");
        assert_eq!(resolved.headers["b"], "3");
        assert_eq!(
            resolved.middleware,
            vec![MiddlewareRef {
                phase: Phase::Pre,
                module_ref: "timing".into()
            }]
        );

        let entries = resolver.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].dir, "");
        assert_eq!(entries[1].dir, "api");
    }

    #[test]
    fn test_explicit_false_disables_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("off/index.config.json"), r#"{"enabled": false}"#);
        write(&root.join("off/on/index.config.json"), r#"{"enabled": true}"#);
        fs::create_dir_all(root.join("off/still")).unwrap();

        let registry = Registry::new();
        let mut resolver = ChainResolver::new(&FsModuleLoader, &registry);
        assert!(!resolver.resolve(root, &root.join("off")).unwrap().enabled);
        assert!(!resolver.resolve(root, &root.join("off/still")).unwrap().enabled);
        assert!(resolver.resolve(root, &root.join("off/on")).unwrap().enabled);
    }

    #[test]
    fn test_broken_config_only_affects_its_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("bad/index.config.json"), "{ nope");
        write(
            &root.join("unknown/index.config.json"),
            r#"{"middleware": [{"handler": "missing"}]}"#,
        );
        fs::create_dir_all(root.join("good")).unwrap();

        let registry = Registry::with_builtins();
        let mut resolver = ChainResolver::new(&FsModuleLoader, &registry);
        assert!(matches!(
            resolver.resolve(root, &root.join("bad")),
            Err(BuildError::ConfigLoad { .. })
        ));
        assert!(matches!(
            resolver.resolve(root, &root.join("unknown")),
            Err(BuildError::ConfigLoad { .. })
        ));
        assert!(resolver.resolve(root, &root.join("good")).is_ok());
    }
}
