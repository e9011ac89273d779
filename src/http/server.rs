//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, concurrency, panics)
//! - Bound time-to-headers per image request; expiry serves the placeholder
//! - Bind server to listener and shut down gracefully
//! - Dispatch image requests to the proxy pipeline

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{RawQuery, State},
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::{CacheConfig, ProxyConfig};
use crate::http::request::{request_id, target_param, UuidRequestId};
use crate::http::response::{placeholder_response, render};
use crate::observability::metrics;
use crate::observability::reporter::{ErrorReporter, ReportContext, TracingReporter};
use crate::proxy::{ImageFetcher, ImageProxy, ProxyOutcome};

/// Path of the image proxy endpoint.
pub const IMAGE_PROXY_PATH: &str = "/api/image-proxy";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: ImageProxy,
    pub cache: CacheConfig,
    /// Deadline for producing response headers.
    pub request_timeout: Duration,
}

/// A handler panic, as handed to the error reporter.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server reporting errors through `tracing`.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        Self::with_reporter(config, Arc::new(TracingReporter))
    }

    /// Create a new HTTP server with a custom error reporter.
    pub fn with_reporter(
        config: ProxyConfig,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, reqwest::Error> {
        let fetcher = ImageFetcher::new(config.upstream.clone(), reporter.clone())?;
        let state = AppState {
            proxy: ImageProxy::new(fetcher),
            cache: config.cache.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(&config, state, reporter);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ProxyConfig,
        state: AppState,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Router {
        let panic_cache = config.cache.clone();

        Router::new()
            .route(IMAGE_PROXY_PATH, get(image_proxy_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(
                move |panic: Box<dyn Any + Send + 'static>| {
                    panic_response(&*panic, &panic_cache, reporter.as_ref())
                },
            ))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The configured router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// `GET /api/image-proxy?url=...`
async fn image_proxy_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let span = tracing::info_span!("image_proxy", request_id = %request_id(&headers));

    async move {
        let target = target_param(query.as_deref());
        let outcome = match tokio::time::timeout(
            state.request_timeout,
            state.proxy.resolve(target.as_deref()),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = state.request_timeout.as_secs(),
                    "Request deadline exceeded, serving placeholder"
                );
                ProxyOutcome::DeadlineExceeded
            }
        };
        let label = outcome.as_str();

        let response = render(outcome, &state.cache);
        metrics::record_request(label, response.status().as_u16(), start);
        tracing::info!(
            outcome = label,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image request handled"
        );
        response
    }
    .instrument(span)
    .await
}

async fn health_handler() -> impl IntoResponse {
    ([(CACHE_CONTROL, "no-store")], "ok")
}

/// Placeholder for a panicked handler. The panic goes to the reporter.
fn panic_response(
    panic: &(dyn Any + Send),
    cache: &CacheConfig,
    reporter: &dyn ErrorReporter,
) -> Response {
    let err = HandlerPanic(panic_message(panic).to_string());
    reporter.report(
        &err,
        &ReportContext {
            stage: "handler",
            candidate: "",
        },
    );
    placeholder_response(StatusCode::OK, cache)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
