//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → reporter.rs (unexpected errors tagged with the upstream URL)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON or pretty)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Error tracking (any ErrorReporter implementation)
//! ```

pub mod logging;
pub mod metrics;
pub mod reporter;

pub use reporter::{ErrorReporter, RecordingReporter, ReportContext, TracingReporter};
