//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use route_mock::config::ServerConfig;
use route_mock::dispatch::Registry;
use route_mock::http::MockServer;
use route_mock::lifecycle::Shutdown;
use route_mock::manifest::ManifestStore;
use route_mock::scan::{FsModuleLoader, ModuleLoader, ScanOptions, Scanner};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A mock tree on disk, removed on drop.
pub struct MockTree {
    dir: TempDir,
}

impl MockTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn scanner(&self) -> Scanner {
        self.scanner_with(Arc::new(FsModuleLoader), Registry::with_builtins())
    }

    pub fn scanner_with(&self, loader: Arc<dyn ModuleLoader>, registry: Registry) -> Scanner {
        Scanner::new(ScanOptions::new([self.root()]), loader, registry)
    }

    /// Scan and compile into a fresh store.
    pub fn store(&self) -> ManifestStore {
        let (pipeline, _) = self.scanner().build().unwrap();
        ManifestStore::new(pipeline)
    }
}

/// A server running on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.task.await;
    }
}

/// Serve `store` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_server(store: ManifestStore, config: ServerConfig) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = MockServer::new(store, config);
    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });
    RunningServer {
        addr,
        shutdown,
        task,
    }
}
