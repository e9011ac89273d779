//! Error reporting side channel.
//!
//! Unexpected failures are handed to an [`ErrorReporter`] tagged with the
//! upstream URL that produced them. Reporting is fire-and-forget: it never
//! blocks nor fails the request path.

use std::sync::Mutex;

use url::Url;

/// Context attached to a reported error.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Pipeline stage that failed (`fetch`, `stream`, `handler`).
    pub stage: &'static str,
    /// Upstream URL being processed, empty when none applies.
    pub candidate: &'a str,
}

impl<'a> ReportContext<'a> {
    pub fn new(stage: &'static str, candidate: &'a Url) -> Self {
        Self {
            stage,
            candidate: candidate.as_str(),
        }
    }
}

/// Sink for errors that deserve attention beyond routine logging.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: &(dyn std::error::Error + 'static), context: &ReportContext<'_>);
}

/// Reports errors as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &(dyn std::error::Error + 'static), context: &ReportContext<'_>) {
        tracing::error!(
            stage = context.stage,
            candidate = %context.candidate,
            error = %error,
            source = ?error.source().map(ToString::to_string),
            "Image proxy error"
        );
    }
}

/// A report captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReport {
    pub stage: &'static str,
    pub candidate: String,
    pub message: String,
}

/// Keeps reports in memory. Used by tests and embedding applications that
/// forward errors elsewhere themselves.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<RecordedReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &(dyn std::error::Error + 'static), context: &ReportContext<'_>) {
        let report = RecordedReport {
            stage: context.stage,
            candidate: context.candidate.to_string(),
            message: error.to_string(),
        };
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}
