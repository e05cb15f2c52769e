//! route-mock
//!
//! Serves a mock HTTP API from a directory tree of route files.
//!
//! ```text
//!   mock/                                ┌──────────────┐     ┌──────────────┐
//!   ├── index.config.json   ──scan──▶    │   manifest   │──▶  │   dispatch   │──▶ response
//!   ├── users.get.json                   │ (versioned,  │     │ pre/normal/  │
//!   └── users/[id].get.json              │   sorted)    │     │ handler/post │
//!                                        └──────────────┘     └──────────────┘
//!                  ▲                            │
//!                  └──── notify watcher ◀───────┘ atomic swap on change
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use route_mock::config::{load_config, MockConfig};
use route_mock::dispatch::{Pipeline, Registry};
use route_mock::http::MockServer;
use route_mock::lifecycle::{trigger_on_signal, Shutdown};
use route_mock::manifest::{Manifest, ManifestStore};
use route_mock::observability::{init_logging, init_metrics};
use route_mock::scan::{Diagnostics, FsModuleLoader, ScanOptions, Scanner};
use route_mock::watch::ManifestWatcher;

/// Config file read when `--config` is not given and it exists.
const DEFAULT_CONFIG: &str = "route-mock.toml";

#[derive(Parser)]
#[command(name = "route-mock", version)]
#[command(about = "Serve a mock HTTP API from a directory of route files", long_about = None)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the mock tree (or load a prebuilt manifest) and serve it
    Serve {
        /// Serve this manifest instead of scanning; disables hot reload.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Override `server.bind_address`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Scan the mock tree and write the manifest JSON
    Build {
        /// Override `manifest.output`.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Exit with an error when the scan reported failures.
        #[arg(long)]
        strict: bool,
    },
    /// Print the sorted route table
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = read_config(cli.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(
        roots = ?config.scan.roots,
        version = env!("CARGO_PKG_VERSION"),
        "route-mock starting"
    );

    let registry = Registry::with_builtins();
    let scanner = Scanner::new(
        ScanOptions::from_config(&config.scan)?,
        Arc::new(FsModuleLoader),
        registry.clone(),
    );

    match cli.command {
        Commands::Serve { manifest, bind } => {
            serve(config, scanner, registry, manifest, bind).await
        }
        Commands::Build { out, strict } => {
            let report = scanner.scan();
            print_diagnostics(&report.diagnostics);
            // Refuse to write a manifest the server could not load.
            Pipeline::compile(report.manifest.clone(), &registry)?;

            let out = out.unwrap_or(config.manifest.output);
            report.manifest.write(&out)?;
            println!(
                "wrote {} ({} routes, {} diagnostics)",
                out.display(),
                report.manifest.routes.len(),
                report.diagnostics.len()
            );

            if strict && report.diagnostics.has_errors() {
                return Err(format!(
                    "scan reported {} error(s)",
                    report.diagnostics.errors().count()
                )
                .into());
            }
            Ok(())
        }
        Commands::Routes => {
            let report = scanner.scan();
            print_routes(&report.manifest);
            print_diagnostics(&report.diagnostics);
            Ok(())
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<MockConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None if Path::new(DEFAULT_CONFIG).is_file() => Ok(load_config(Path::new(DEFAULT_CONFIG))?),
        None => Ok(MockConfig::default()),
    }
}

async fn serve(
    mut config: MockConfig,
    scanner: Scanner,
    registry: Registry,
    manifest: Option<PathBuf>,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let prebuilt = manifest.is_some();
    let pipeline = match manifest {
        Some(path) => {
            let manifest = Manifest::read(&path)?;
            tracing::info!(
                path = %path.display(),
                routes = manifest.routes.len(),
                "Loaded prebuilt manifest"
            );
            Pipeline::compile(manifest, &registry)?
        }
        None => {
            let (pipeline, diagnostics) = scanner.build()?;
            print_diagnostics(&diagnostics);
            pipeline
        }
    };
    let store = ManifestStore::new(pipeline);

    let shutdown = Shutdown::new();
    trigger_on_signal(shutdown.clone());

    let watch = if config.watch.enabled && !prebuilt {
        let watcher = ManifestWatcher::new(
            scanner,
            store.clone(),
            Duration::from_millis(config.watch.debounce_ms),
        );
        match watcher.run(&shutdown) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "File watcher unavailable; hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    MockServer::new(store, config.server.clone())
        .run(listener, shutdown)
        .await?;

    if let Some(watch) = watch {
        watch.join().await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_routes(manifest: &Manifest) {
    println!(
        "{:<8} {:<40} {:>6} {:>7} {:<8} SOURCE",
        "METHOD", "TEMPLATE", "STATUS", "DELAY", "ENABLED"
    );
    for route in &manifest.routes {
        println!(
            "{:<8} {:<40} {:>6} {:>5}ms {:<8} {}",
            route.method.as_str(),
            route.template.to_string(),
            route.status,
            route.delay,
            route.enabled,
            route.source
        );
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
        eprintln!("error: {diagnostic}");
    }
}
