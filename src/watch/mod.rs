//! Hot reload of the mock tree.
//!
//! # Data Flow
//! ```text
//! notify event (any scan root, recursive)
//!     → mpsc channel
//!     → rebuild task (debounce, then Scanner::build on a blocking thread)
//!     → ManifestStore::publish (atomic swap)
//! ```
//!
//! # Design Decisions
//! - A burst of events produces one rescan after a quiet period
//! - A rebuild that fails to compile keeps the current snapshot
//! - In-flight requests finish against the snapshot they matched on

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::manifest::ManifestStore;
use crate::scan::Scanner;

/// Watches every scan root and republishes on change.
pub struct ManifestWatcher {
    scanner: Scanner,
    store: ManifestStore,
    debounce: Duration,
}

/// Keeps the OS watcher and rebuild task alive.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Wait for the rebuild task to stop after shutdown.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl ManifestWatcher {
    pub fn new(scanner: Scanner, store: ManifestStore, debounce: Duration) -> Self {
        Self {
            scanner,
            store,
            debounce,
        }
    }

    /// Start watching. Events stop being processed when `shutdown` triggers.
    pub fn run(self, shutdown: &Shutdown) -> Result<WatchHandle, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove() {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let roots: Vec<PathBuf> = self.scanner.options().roots.clone();
        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        tracing::info!(roots = ?roots, "Mock tree watcher started");

        let task = tokio::spawn(self.rebuild_loop(rx, shutdown.subscribe()));
        Ok(WatchHandle {
            _watcher: watcher,
            task,
        })
    }

    async fn rebuild_loop(
        self,
        mut rx: mpsc::UnboundedReceiver<PathBuf>,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) {
        loop {
            let first = tokio::select! {
                _ = shutdown.recv() => break,
                path = rx.recv() => match path {
                    Some(path) => path,
                    None => break,
                },
            };

            // Drain the burst until the tree has been quiet for `debounce`.
            let mut changed = 1usize;
            loop {
                match tokio::time::timeout(self.debounce, rx.recv()).await {
                    Ok(Some(_)) => changed += 1,
                    Ok(None) | Err(_) => break,
                }
            }
            tracing::info!(first = %first.display(), changed, "Mock tree changed, rescanning");

            let scanner = self.scanner.clone();
            match tokio::task::spawn_blocking(move || scanner.build()).await {
                Ok(Ok((pipeline, diagnostics))) => {
                    if diagnostics.has_errors() {
                        tracing::warn!(
                            errors = diagnostics.errors().count(),
                            "Rescan reported errors; affected routes were skipped"
                        );
                    }
                    self.store.publish(pipeline);
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        error = %e,
                        "Rebuilt manifest failed to compile. Keeping current routes."
                    )
                }
                Err(e) => {
                    tracing::error!(error = %e, "Rescan task failed. Keeping current routes.")
                }
            }
        }
        tracing::info!("Mock tree watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Registry;
    use crate::scan::{FsModuleLoader, ScanOptions};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_rescans_and_publishes_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("a.get.json"), "1").unwrap();

        let scanner = Scanner::new(
            ScanOptions::new([root.clone()]),
            Arc::new(FsModuleLoader),
            Registry::with_builtins(),
        );
        let (pipeline, _) = scanner.build().unwrap();
        let store = ManifestStore::new(pipeline);
        let shutdown = Shutdown::new();
        let handle = ManifestWatcher::new(scanner, store.clone(), Duration::from_millis(50))
            .run(&shutdown)
            .unwrap();

        std::fs::write(root.join("b.get.json"), "2").unwrap();

        let mut published = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if store.snapshot().manifest().routes.len() == 2 {
                published = true;
                break;
            }
        }
        assert!(published, "second route was never published");

        shutdown.trigger();
        handle.join().await;
    }
}
