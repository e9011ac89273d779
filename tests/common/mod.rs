//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image_proxy::observability::RecordingReporter;
use image_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

/// A PNG-signed body of exactly `len` bytes.
pub fn png_bytes(len: usize) -> Vec<u8> {
    signed(PNG_SIGNATURE, len)
}

/// A JPEG-signed body of exactly `len` bytes.
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    signed(JPEG_SIGNATURE, len)
}

fn signed(signature: &[u8], len: usize) -> Vec<u8> {
    let mut body = signature.to_vec();
    body.resize(len.max(signature.len()), 0x42);
    body
}

/// How the mock upstream sends its body.
#[derive(Debug, Clone)]
pub enum MockBody {
    /// One write. `Content-Length` is derived unless set explicitly.
    Full(Vec<u8>),
    /// Headers as given, these bytes, then the connection is held open.
    Partial(Vec<u8>),
    /// `Transfer-Encoding: chunked`, one HTTP chunk per entry.
    Chunked {
        chunks: Vec<Vec<u8>>,
        delay: Duration,
        /// Keep the connection open without finishing the body.
        stall: bool,
    },
}

/// A canned upstream response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: MockBody,
    /// Delay before the status line is written.
    pub delay: Duration,
}

impl MockResponse {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self::status(200).header("Content-Type", content_type).body(body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: MockBody::Full(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Accept the connection and never answer.
    pub fn hang() -> Self {
        Self::status(200).delay(Duration::from_secs(3600))
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = MockBody::Full(body);
        self
    }

    pub fn chunked(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.body = MockBody::Chunked {
            chunks,
            delay: Duration::ZERO,
            stall: false,
        };
        self
    }

    /// Chunked body that stops sending after `chunks`.
    pub fn stalled(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.body = MockBody::Chunked {
            chunks,
            delay: Duration::ZERO,
            stall: true,
        };
        self
    }

    /// Send headers and `body`, then never finish.
    pub fn partial(mut self, body: Vec<u8>) -> Self {
        self.body = MockBody::Partial(body);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// A running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a programmable upstream on an ephemeral loopback port. `respond`
/// receives the request target (path and query).
pub async fn start_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                serve_connection(socket, respond.as_ref(), &counter).await;
            });
        }
    });

    MockUpstream { addr, hits }
}

async fn serve_connection<F>(mut socket: TcpStream, respond: &F, hits: &AtomicUsize)
where
    F: Fn(&str) -> MockResponse,
{
    let Some(path) = read_request_target(&mut socket).await else {
        return;
    };
    hits.fetch_add(1, Ordering::SeqCst);
    let response = respond(&path);

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let mut head = format!("HTTP/1.1 {} Mock\r\nConnection: close\r\n", response.status);
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }

    match &response.body {
        MockBody::Full(body) => {
            if !response.has_header("Content-Length") {
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            head.push_str("\r\n");
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.write_all(body).await;
        }
        MockBody::Partial(body) => {
            head.push_str("\r\n");
            if socket.write_all(head.as_bytes()).await.is_err()
                || socket.write_all(body).await.is_err()
            {
                return;
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
        MockBody::Chunked {
            chunks,
            delay,
            stall,
        } => {
            head.push_str("Transfer-Encoding: chunked\r\n\r\n");
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for chunk in chunks {
                let frame_head = format!("{:x}\r\n", chunk.len());
                if socket.write_all(frame_head.as_bytes()).await.is_err()
                    || socket.write_all(chunk).await.is_err()
                    || socket.write_all(b"\r\n").await.is_err()
                {
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
            }
            if *stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
    }
    let _ = socket.shutdown().await;
}

/// Read the request head and return the request target.
async fn read_request_target(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

/// A proxy instance serving on an ephemeral loopback port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub reporter: Arc<RecordingReporter>,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestProxy {
    /// Proxy URL for `target`, form-encoded into the `url` parameter.
    pub fn image_url(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("http://{}/api/image-proxy?url={}", self.addr, encoded)
    }

    pub async fn get_image(&self, target: &str) -> reqwest::Response {
        self.client.get(self.image_url(target)).send().await.unwrap()
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{}{}", self.addr, path_and_query))
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config suited to loopback tests.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.use_env_proxy = false;
    config
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let reporter = Arc::new(RecordingReporter::default());
    let server = HttpServer::with_reporter(config, reporter.clone()).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    TestProxy {
        addr,
        reporter,
        client,
        shutdown,
    }
}
