//! Directory scanning.
//!
//! # Responsibilities
//! - Walk every root depth-first in lexicographic order
//! - Filter candidate files (ignore prefix → include → exclude → directory enabled)
//! - Feed each route file through the config chain and the rule normalizer
//! - Hand the collected rules to the manifest builder
//!
//! # Design Decisions
//! - Nothing aborts a scan; every skip and failure becomes a diagnostic
//! - Symlinks are not followed
//! - Source paths are the configured root joined with the root-relative path,
//!   so an unchanged tree always yields a byte-identical manifest

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use glob::{MatchOptions, Pattern, PatternError};

use crate::config::schema::ScanConfig;
use crate::dispatch::pipeline::Pipeline;
use crate::dispatch::registry::Registry;
use crate::manifest::{Manifest, ManifestBuilder, ManifestError};
use crate::observability::metrics;
use crate::routing::RouteFile;
use crate::rules::{normalize, RuleContext};
use crate::scan::chain::{is_config_file, ChainResolver};
use crate::scan::diagnostics::{BuildError, Diagnostics, SkipReason};
use crate::scan::loader::ModuleLoader;
use crate::scan::slash_path;

/// Dependency and version-control directories never walked.
pub const SKIPPED_DIRS: [&str; 5] = ["node_modules", ".git", ".hg", ".svn", "target"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// What to scan and which files to keep.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub roots: Vec<PathBuf>,
    pub include: Vec<Pattern>,
    pub exclude: Vec<Pattern>,
    pub ignore_prefixes: Vec<String>,
}

impl ScanOptions {
    /// Scan `roots` with the default ignore prefixes and no patterns.
    pub fn new<P: Into<PathBuf>>(roots: impl IntoIterator<Item = P>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            include: Vec::new(),
            exclude: Vec::new(),
            ignore_prefixes: ScanConfig::default().ignore_prefixes,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self, PatternError> {
        Ok(Self {
            roots: config.roots.clone(),
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
            ignore_prefixes: config.ignore_prefixes.clone(),
        })
    }

    pub fn include(mut self, pattern: &str) -> Result<Self, PatternError> {
        self.include.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn exclude(mut self, pattern: &str) -> Result<Self, PatternError> {
        self.exclude.push(Pattern::new(pattern)?);
        Ok(self)
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Pattern verdict for a root-relative, `/`-separated path.
    fn filter(&self, rel: &str) -> Option<SkipReason> {
        if !self.include.is_empty()
            && !self
                .include
                .iter()
                .any(|p| p.matches_with(rel, MATCH_OPTIONS))
        {
            return Some(SkipReason::Excluded);
        }
        if self.exclude.iter().any(|p| p.matches_with(rel, MATCH_OPTIONS)) {
            return Some(SkipReason::Excluded);
        }
        None
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p)).collect()
}

/// Result of one scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub manifest: Manifest,
    pub diagnostics: Diagnostics,
}

/// Turns directory trees into manifests.
#[derive(Clone)]
pub struct Scanner {
    options: ScanOptions,
    loader: Arc<dyn ModuleLoader>,
    registry: Registry,
}

impl Scanner {
    pub fn new(options: ScanOptions, loader: Arc<dyn ModuleLoader>, registry: Registry) -> Self {
        Self {
            options,
            loader,
            registry,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scan every root and build a manifest.
    pub fn scan(&self) -> ScanReport {
        let started = Instant::now();
        let mut walk = Walk {
            scanner: self,
            resolver: ChainResolver::new(self.loader.as_ref(), &self.registry),
            builder: ManifestBuilder::new(),
            diagnostics: Diagnostics::new(),
        };

        for root in &self.options.roots {
            if root.is_dir() {
                walk.dir(root, root);
            } else {
                walk.diagnostics.fail(
                    slash_path(root),
                    BuildError::Unreadable("scan root is not a directory".to_string()),
                );
            }
        }

        let Walk {
            resolver,
            builder,
            diagnostics,
            ..
        } = walk;
        let manifest = builder.finish(resolver.entries());

        metrics::record_scan(manifest.routes.len(), &diagnostics);
        tracing::info!(
            routes = manifest.routes.len(),
            active = manifest.active_routes().count(),
            diagnostics = diagnostics.len(),
            errors = diagnostics.errors().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan complete"
        );

        ScanReport {
            manifest,
            diagnostics,
        }
    }

    /// Scan and compile in one step.
    pub fn build(&self) -> Result<(Pipeline, Diagnostics), ManifestError> {
        let report = self.scan();
        let pipeline = Pipeline::compile(report.manifest, &self.registry)?;
        Ok((pipeline, report.diagnostics))
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

/// State of one scan in progress.
struct Walk<'a> {
    scanner: &'a Scanner,
    resolver: ChainResolver<'a>,
    builder: ManifestBuilder,
    diagnostics: Diagnostics,
}

impl Walk<'_> {
    fn dir(&mut self, root: &Path, dir: &Path) {
        let mut entries = match fs::read_dir(dir) {
            Ok(entries) => readable(dir, entries, &mut self.diagnostics),
            Err(e) => {
                self.diagnostics
                    .fail(slash_path(dir), BuildError::Unreadable(e.to_string()));
                return;
            }
        };
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    self.diagnostics
                        .fail(slash_path(&path), BuildError::Unreadable(e.to_string()));
                    continue;
                }
            };

            if file_type.is_dir() {
                if SKIPPED_DIRS.contains(&name.as_str()) {
                    tracing::trace!(path = %path.display(), "Skipping dependency directory");
                } else if self.scanner.options.is_ignored(&name) {
                    self.diagnostics.skip(slash_path(&path), SkipReason::Ignored);
                } else {
                    self.dir(root, &path);
                }
            } else if file_type.is_file() {
                self.file(root, &path, &name);
            }
        }
    }

    fn file(&mut self, root: &Path, path: &Path, name: &str) {
        let scanner = self.scanner;
        let source = slash_path(path);

        if scanner.options.is_ignored(name) {
            self.diagnostics.skip(source, SkipReason::Ignored);
            return;
        }
        if is_config_file(path) {
            return;
        }
        if !scanner.loader.supports(path) {
            self.diagnostics.skip(source, SkipReason::Unsupported);
            return;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        if let Some(reason) = scanner.options.filter(&slash_path(rel)) {
            self.diagnostics.skip(source, reason);
            return;
        }

        let chain = match self.resolver.resolve(root, path.parent().unwrap_or(root)) {
            Ok(chain) => chain,
            Err(e) => {
                self.diagnostics.fail(source, e);
                return;
            }
        };
        if !chain.enabled {
            self.diagnostics.skip(source, SkipReason::Disabled);
            return;
        }

        let export = match scanner.loader.load(path) {
            Ok(Some(export)) => export,
            Ok(None) => {
                self.diagnostics.skip(source, SkipReason::Unsupported);
                return;
            }
            Err(e) => {
                self.diagnostics.fail(source, BuildError::ModuleLoad(e.to_string()));
                return;
            }
        };

        let derived = RouteFile::parse(rel);
        let ctx = RuleContext {
            derived: &derived,
            chain: &chain,
            registry: &scanner.registry,
            source: &source,
        };
        for result in normalize(export, &ctx) {
            match result {
                Ok(rule) => self.builder.push(rule, &mut self.diagnostics),
                Err(e) => self.diagnostics.fail(source.clone(), e),
            }
        }
    }
}

/// Keep the entries that could be read; report the rest against `dir`.
fn readable<T>(
    dir: &Path,
    entries: impl IntoIterator<Item = io::Result<T>>,
    diagnostics: &mut Diagnostics,
) -> Vec<T> {
    let mut kept = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => kept.push(entry),
            Err(e) => diagnostics.fail(slash_path(dir), BuildError::Unreadable(e.to_string())),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::diagnostics::Diagnostic;
    use crate::scan::loader::FsModuleLoader;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner(options: ScanOptions) -> Scanner {
        Scanner::new(options, Arc::new(FsModuleLoader), Registry::with_builtins())
    }

    fn reasons(report: &ScanReport) -> Vec<(String, &'static str)> {
        report
            .diagnostics
            .iter()
            .map(|d| {
                let path = d.path().rsplit('/').next().unwrap_or_default().to_string();
                (path, d.code())
            })
            .collect()
    }

    #[test]
    fn test_classifies_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "users.get.json", r#"{"ok": true}"#);
        write(root, "notes.md", "hello");
        write(root, "_private.get.json", "1");
        write(root, ".hidden/a.get.json", "1");
        write(root, "node_modules/pkg/x.get.json", "1");
        write(root, "drafts/wip.get.json", "1");
        write(root, "index.config.json", "{}");

        let options = ScanOptions::new([root]).exclude("drafts/**").unwrap();
        let report = scanner(options).scan();

        assert_eq!(report.manifest.routes.len(), 1);
        assert_eq!(report.manifest.routes[0].template.to_string(), "/users");
        assert_eq!(
            reasons(&report),
            vec![
                (".hidden".to_string(), "ignored"),
                ("_private.get.json".to_string(), "ignored"),
                ("wip.get.json".to_string(), "excluded"),
                ("notes.md".to_string(), "unsupported"),
            ]
        );
    }

    #[test]
    fn test_include_patterns_limit_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "api/a.get.json", "1");
        write(root, "other/b.get.json", "1");

        let options = ScanOptions::new([root]).include("api/**/*.json").unwrap();
        let report = scanner(options).scan();
        assert_eq!(report.manifest.routes.len(), 1);
        assert_eq!(report.manifest.routes[0].template.to_string(), "/api/a");
    }

    #[test]
    fn test_disabled_directory_skips_its_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "legacy/index.config.json", r#"{"enabled": false}"#);
        write(root, "legacy/old.get.json", "1");
        write(root, "legacy/v2/index.config.json", r#"{"enabled": true}"#);
        write(root, "legacy/v2/new.get.json", "1");

        let report = scanner(ScanOptions::new([root])).scan();
        let templates: Vec<String> = report
            .manifest
            .active_routes()
            .map(|r| r.template.to_string())
            .collect();
        assert_eq!(templates, vec!["/legacy/v2/new"]);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Skipped { reason: SkipReason::Disabled, .. })));
    }

    #[test]
    fn test_failures_are_file_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "broken.get.json", "{ nope");
        write(root, "nomethod.json", "1");
        write(root, "bad/[x.get.json", "1");
        write(root, "good.get.json", "1");

        let report = scanner(ScanOptions::new([root])).scan();
        assert_eq!(report.manifest.routes.len(), 1);
        let mut codes: Vec<&str> = report.diagnostics.errors().map(Diagnostic::code).collect();
        codes.sort();
        assert_eq!(codes, vec!["ambiguous-method", "invalid-template", "module-load"]);
    }

    #[test]
    fn test_missing_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let report = scanner(ScanOptions::new([missing])).scan();
        assert!(report.manifest.routes.is_empty());
        assert_eq!(report.diagnostics.errors().next().unwrap().code(), "unreadable");
    }

    #[test]
    fn test_unreadable_entries_are_reported() {
        let mut diagnostics = Diagnostics::new();
        let entries = vec![
            Ok("a.get.json"),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok("b.get.json"),
        ];

        let kept = readable(Path::new("mock/users"), entries, &mut diagnostics);
        assert_eq!(kept, vec!["a.get.json", "b.get.json"]);

        let errors: Vec<&Diagnostic> = diagnostics.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "mock/users");
        assert!(matches!(
            errors[0],
            Diagnostic::Failed { error: BuildError::Unreadable(reason), .. } if reason == "denied"
        ));
    }
}
