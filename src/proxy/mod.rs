//! Image proxy pipeline.
//!
//! # Data Flow
//! ```text
//! raw `url` parameter
//!     → normalize.rs (absolute http/https or reject)
//!     → candidates.rs (HTTPS first, HTTP fallback, loopback as-is)
//!     → fetch.rs (sequential attempts, per-attempt timeout)
//!         → sniff.rs (declared vs detected type, raster allowlist)
//!         → stream.rs (bounded pump, byte ceiling, cancellation)
//!     → cache_policy.rs (strong / weak / fallback Cache-Control)
//!     → placeholder.rs on any failure
//! ```
//!
//! # Design Decisions
//! - No state is shared between requests beyond the HTTP connection pool
//! - Every failure mode before headers are committed degrades to the placeholder
//! - After headers are committed a failure can only error the body

pub mod cache_policy;
pub mod candidates;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod placeholder;
pub mod service;
pub mod sniff;
pub mod stream;

pub use cache_policy::CachePolicy;
pub use error::{FetchError, StreamError};
pub use fetch::{FetchedImage, ImageFetcher};
pub use service::{ImageProxy, ProxyOutcome};
