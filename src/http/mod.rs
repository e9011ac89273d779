//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, `url` query parameter)
//!     → proxy pipeline (normalize, fetch, sniff, stream)
//!     → response.rs (image or placeholder, Cache-Control)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, IMAGE_PROXY_PATH};
