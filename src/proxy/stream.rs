//! Size-capped streaming of upstream bodies to the client.
//!
//! # Data Flow
//! ```text
//! upstream body ──▶ pump task ──(bounded mpsc)──▶ response Body ──▶ client
//!                   │
//!                   ├─ StreamBudget: total > limit → error item, upstream dropped
//!                   ├─ idle timeout per read → error item, upstream dropped
//!                   └─ channel closed (client gone) → upstream dropped
//! ```
//!
//! The pump only pulls the next upstream chunk once the previous one was
//! accepted by the channel, so a slow client slows the upstream read instead
//! of growing a buffer. Dropping the upstream stream closes its connection.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use url::Url;

use crate::observability::metrics;
use crate::observability::reporter::{ErrorReporter, ReportContext};
use crate::proxy::error::StreamError;

/// Running byte count checked against a fixed ceiling.
#[derive(Debug, Clone)]
pub struct StreamBudget {
    limit: u64,
    forwarded: u64,
}

impl StreamBudget {
    pub fn new(limit: u64) -> Self {
        Self { limit, forwarded: 0 }
    }

    /// Account for a chunk about to be forwarded.
    ///
    /// Returns false, leaving the count untouched, when the chunk would push
    /// the total past the limit.
    pub fn admit(&mut self, len: usize) -> bool {
        let next = self.forwarded.saturating_add(len as u64);
        if next > self.limit {
            return false;
        }
        self.forwarded = next;
        true
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Tuning for a single streamed response.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub limit: u64,
    pub idle_timeout: Duration,
    pub channel_capacity: usize,
}

/// Build a response body that emits `initial` and then the rest of the
/// upstream stream, enforcing the byte ceiling.
///
/// `initial` has already been checked against the limit by the caller.
pub fn stream_body<S, E>(
    initial: Bytes,
    rest: S,
    settings: StreamSettings,
    source: Url,
    reporter: Arc<dyn ErrorReporter>,
) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));

    let mut budget = StreamBudget::new(settings.limit);
    let admitted = budget.admit(initial.len());
    debug_assert!(admitted, "initial chunk must be checked by the caller");

    tokio::spawn(pump(Pump {
        initial,
        rest,
        budget,
        idle_timeout: settings.idle_timeout,
        tx,
        source,
        reporter,
    }));

    Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

struct Pump<S> {
    initial: Bytes,
    rest: S,
    budget: StreamBudget,
    idle_timeout: Duration,
    tx: mpsc::Sender<Result<Bytes, StreamError>>,
    source: Url,
    reporter: Arc<dyn ErrorReporter>,
}

async fn pump<S, E>(mut p: Pump<S>)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let initial = std::mem::take(&mut p.initial);
    if p.tx.send(Ok(initial)).await.is_err() {
        client_gone(&p);
        return;
    }

    loop {
        let next = tokio::select! {
            _ = p.tx.closed() => {
                client_gone(&p);
                return;
            }
            next = tokio::time::timeout(p.idle_timeout, p.rest.next()) => next,
        };

        let chunk = match next {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(None) => {
                metrics::record_bytes_streamed(p.budget.forwarded());
                tracing::debug!(
                    source = %p.source,
                    bytes = p.budget.forwarded(),
                    "Upstream body complete"
                );
                return;
            }
            Ok(Some(Err(e))) => {
                let err = StreamError::Upstream(e.to_string());
                p.reporter.report(&err, &ReportContext::new("stream", &p.source));
                abort(&p.tx, &p.budget, err).await;
                return;
            }
            Err(_) => {
                let err = StreamError::Stalled(p.idle_timeout);
                p.reporter.report(&err, &ReportContext::new("stream", &p.source));
                abort(&p.tx, &p.budget, err).await;
                return;
            }
        };

        if chunk.is_empty() {
            continue;
        }

        if !p.budget.admit(chunk.len()) {
            let err = StreamError::LimitExceeded {
                limit: p.budget.limit(),
                forwarded: p.budget.forwarded(),
            };
            tracing::warn!(source = %p.source, error = %err, "Aborting oversized image stream");
            abort(&p.tx, &p.budget, err).await;
            return;
        }

        if p.tx.send(Ok(chunk)).await.is_err() {
            client_gone(&p);
            return;
        }
    }
}

async fn abort(
    tx: &mpsc::Sender<Result<Bytes, StreamError>>,
    budget: &StreamBudget,
    err: StreamError,
) {
    metrics::record_stream_aborted(err.reason());
    metrics::record_bytes_streamed(budget.forwarded());
    // The client may already be gone; nothing left to tell it then.
    let _ = tx.send(Err(err)).await;
}

fn client_gone<S>(p: &Pump<S>) {
    metrics::record_stream_aborted("client_disconnect");
    metrics::record_bytes_streamed(p.budget.forwarded());
    tracing::debug!(
        source = %p.source,
        bytes = p.budget.forwarded(),
        "Client disconnected, cancelling upstream read"
    );
}
