//! Failure injection tests for candidate fallback.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image_proxy::config::UpstreamConfig;
use image_proxy::observability::RecordingReporter;
use image_proxy::proxy::{CachePolicy, ImageFetcher};
use tokio::net::TcpListener;
use url::Url;

mod common;

use common::{jpeg_bytes, png_bytes, start_upstream, MockResponse};

fn fetcher(attempt_timeout_ms: u64) -> (ImageFetcher, Arc<RecordingReporter>) {
    let config = UpstreamConfig {
        attempt_timeout_ms,
        use_env_proxy: false,
        ..UpstreamConfig::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let fetcher = ImageFetcher::new(config, reporter.clone()).unwrap();
    (fetcher, reporter)
}

#[tokio::test]
async fn test_hanging_candidate_falls_back_to_next() {
    let hanging = start_upstream(|_| MockResponse::hang()).await;
    let photo = jpeg_bytes(4_096);
    let served = photo.clone();
    let healthy = start_upstream(move |_| MockResponse::ok("image/jpeg", served.clone())).await;

    let (fetcher, reporter) = fetcher(300);
    let candidates = vec![
        Url::parse(&hanging.url("/photo.jpg")).unwrap(),
        Url::parse(&healthy.url("/photo.jpg")).unwrap(),
    ];

    let start = Instant::now();
    let image = fetcher.fetch_first(&candidates).await.expect("second candidate serves");

    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(image.url, candidates[1]);
    assert_eq!(image.content_type, "image/jpeg");
    assert_eq!(CachePolicy::for_url(&image.url), CachePolicy::Weak);

    let body = axum::body::to_bytes(image.body, usize::MAX).await.unwrap();
    assert_eq!(body.to_vec(), photo);

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].stage, "fetch");
    assert_eq!(reports[0].candidate, candidates[0].as_str());
}

#[tokio::test]
async fn test_candidates_are_attempted_sequentially() {
    let slow_failure = start_upstream(|_| MockResponse::status(503).delay(Duration::from_millis(200))).await;
    let second_hit: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    let recorded = second_hit.clone();
    let healthy = start_upstream(move |_| {
        *recorded.lock().unwrap() = Some(Instant::now());
        MockResponse::ok("image/png", png_bytes(128))
    })
    .await;

    let (fetcher, reporter) = fetcher(2_000);
    let candidates = vec![
        Url::parse(&slow_failure.url("/a.png")).unwrap(),
        Url::parse(&healthy.url("/a.png")).unwrap(),
    ];

    let start = Instant::now();
    let image = fetcher.fetch_first(&candidates).await.unwrap();

    assert_eq!(image.url, candidates[1]);
    let hit_at = second_hit.lock().unwrap().take().expect("second candidate was requested");
    assert!(hit_at.duration_since(start) >= Duration::from_millis(200));
    // Status rejections are logged, not reported.
    assert!(reporter.reports().is_empty());
}

#[tokio::test]
async fn test_first_success_stops_iteration() {
    let first = start_upstream(|_| MockResponse::ok("image/png", png_bytes(128))).await;
    let second = start_upstream(|_| MockResponse::ok("image/png", png_bytes(128))).await;

    let (fetcher, _) = fetcher(2_000);
    let candidates = vec![
        Url::parse(&first.url("/a.png")).unwrap(),
        Url::parse(&second.url("/a.png")).unwrap(),
    ];

    let image = fetcher.fetch_first(&candidates).await.unwrap();

    assert_eq!(image.url, candidates[0]);
    assert_eq!(first.hits(), 1);
    assert_eq!(second.hits(), 0);
}

#[tokio::test]
async fn test_all_rejections_exhaust_without_reports() {
    let html = start_upstream(|_| MockResponse::ok("text/html", b"<html></html>".to_vec())).await;
    let broken = start_upstream(|_| MockResponse::status(500)).await;

    let (fetcher, reporter) = fetcher(2_000);
    let candidates = vec![
        Url::parse(&html.url("/a.png")).unwrap(),
        Url::parse(&broken.url("/a.png")).unwrap(),
    ];

    assert!(fetcher.fetch_first(&candidates).await.is_none());
    assert_eq!(html.hits(), 1);
    assert_eq!(broken.hits(), 1);
    assert!(reporter.reports().is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (fetcher, reporter) = fetcher(2_000);
    let candidate = Url::parse(&format!("http://{}/a.png", addr)).unwrap();

    assert!(fetcher.fetch_first(std::slice::from_ref(&candidate)).await.is_none());

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].stage, "fetch");
    assert_eq!(reports[0].candidate, candidate.as_str());
}

#[tokio::test]
async fn test_oversized_body_is_not_fully_forwarded() {
    let limit = 100_000u64;
    let upstream = start_upstream(|_| {
        let mut chunks = vec![png_bytes(64)];
        chunks.extend((0..4).map(|_| vec![0u8; 64 * 1024]));
        MockResponse::status(200)
            .header("Content-Type", "image/png")
            .chunked(chunks)
    })
    .await;

    let config = UpstreamConfig {
        max_body_bytes: limit,
        use_env_proxy: false,
        ..UpstreamConfig::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let fetcher = ImageFetcher::new(config, reporter.clone()).unwrap();

    let candidate = Url::parse(&upstream.url("/big.png")).unwrap();
    let image = fetcher.fetch_first(std::slice::from_ref(&candidate)).await.unwrap();

    // Collecting fails once the ceiling is hit.
    assert!(axum::body::to_bytes(image.body, usize::MAX).await.is_err());
    assert!(reporter.reports().is_empty());
}
