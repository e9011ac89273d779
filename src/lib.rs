//! Image proxy library.
//!
//! Fetches untrusted third-party images, verifies they are raster images by
//! their bytes, streams them under a hard size cap and picks a Cache-Control
//! policy from the URL's versioning signal.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
