//! HTTP host adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layers)
//!     → request.rs (request ID, body limit, axum → MockRequest)
//!     → ManifestStore snapshot → Pipeline::dispatch
//!     → response.rs (MockResponse → axum, 404 / 500 shaping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{mock_layer, AppState, MockServer};
