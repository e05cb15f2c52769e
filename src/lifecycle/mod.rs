//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! SIGINT / SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs, broadcast)
//!     → HTTP server stops accepting and drains in-flight requests
//!     → manifest watcher leaves its rebuild loop
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, trigger_on_signal};
