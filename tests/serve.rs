//! End-to-end tests over a real socket

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use asset_server::config::{AppState, Config};
use asset_server::http::cache::EtagSeed;
use asset_server::server::{create_reusable_listener, start_server_loop, ServerLoopConfig};

const SEED: &str = "1700000000";

struct TestServer {
    addr: SocketAddr,
    shutdown: Arc<Notify>,
    handle: JoinHandle<usize>,
    root: tempfile::TempDir,
}

async fn start(extra: &[(&str, &str)]) -> TestServer {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("index.html"), "hello world").unwrap();
    std::fs::write(root.path().join("app.js"), "console.log(1);").unwrap();

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "WEB_ROOT".to_string(),
        root.path().to_str().unwrap().to_string(),
    );
    vars.insert("ASSETS_LOGGING__ACCESS_LOG".to_string(), "false".to_string());
    for (k, v) in extra {
        vars.insert((*k).to_string(), (*v).to_string());
    }

    let cfg = Config::load_with("no-such-config-file", &vars).unwrap();
    let state = Arc::new(AppState::with_seed(&cfg, EtagSeed::new(SEED)));

    let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Notify::new());

    let handle = tokio::spawn(start_server_loop(
        listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            shutdown_signal: Arc::clone(&shutdown),
            shutdown_timeout: Duration::from_secs(2),
        },
    ));

    TestServer {
        addr,
        shutdown,
        handle,
        root,
    }
}

async fn send(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

fn get(path: &str, extra_headers: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n{extra_headers}\r\n")
}

fn status(response: &str) -> u16 {
    response
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap()
}

fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let head = response.split("\r\n\r\n").next()?;
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, b)| b)
}

#[tokio::test]
async fn test_get_serves_file_with_validator_headers() {
    let server = start(&[]).await;

    let response = send(server.addr, &get("/index.html", "")).await;
    assert_eq!(status(&response), 200);
    assert_eq!(header(&response, "etag"), Some("/index.html-1700000000"));
    assert_eq!(header(&response, "cache-control"), Some("max-age=2592000"));
    assert_eq!(body(&response), "hello world");
}

#[tokio::test]
async fn test_revalidation_returns_not_modified() {
    let server = start(&[]).await;

    let first = send(server.addr, &get("/index.html", "")).await;
    let etag = header(&first, "etag").unwrap().to_string();

    let second = send(
        server.addr,
        &get("/index.html", &format!("If-None-Match: {etag}\r\n")),
    )
    .await;
    assert_eq!(status(&second), 304);
    assert_eq!(header(&second, "etag"), Some(etag.as_str()));
    assert_eq!(body(&second), "");
}

#[tokio::test]
async fn test_stale_etag_serves_file() {
    let server = start(&[]).await;

    let response = send(
        server.addr,
        &get("/index.html", "If-None-Match: /index.html-1600000000\r\n"),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), "hello world");
}

#[tokio::test]
async fn test_post_is_rejected() {
    let server = start(&[]).await;

    let response = send(
        server.addr,
        "POST /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    assert_eq!(status(&response), 405);
    assert_eq!(header(&response, "allow"), Some("GET"));
    assert!(header(&response, "etag").is_none());
    assert_eq!(body(&response), "");
}

#[tokio::test]
async fn test_prefix_is_stripped_before_lookup() {
    let server = start(&[("APP_ROOT", "/static")]).await;

    let response = send(server.addr, &get("/static/app.js", "")).await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), "console.log(1);");
    assert_eq!(
        header(&response, "etag"),
        Some("/static/app.js-1700000000")
    );
}

#[tokio::test]
async fn test_no_cache_disables_validation() {
    let server = start(&[("NO_CACHE", "true")]).await;

    let response = send(
        server.addr,
        &get("/index.html", "If-None-Match: /index.html-1700000000\r\n"),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert!(header(&response, "etag").is_none());
    assert!(header(&response, "cache-control").is_none());
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = start(&[]).await;
    assert_eq!(status(&send(server.addr, &get("/", "")).await), 200);

    server.shutdown.notify_one();
    let remaining = server.handle.await.unwrap();
    assert_eq!(remaining, 0);
    assert!(TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn test_idle_keep_alive_connection_is_closed() {
    let server = start(&[("ASSETS_PERFORMANCE__KEEP_ALIVE_TIMEOUT", "1")]).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];
    while !received.ends_with(b"hello world") {
        let n = stream.read(&mut chunk).await.unwrap();
        assert_ne!(n, 0, "connection closed before the response arrived");
        received.extend_from_slice(&chunk[..n]);
    }

    // No second request: the server closes once the keep-alive window ends
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_slow_download_outlives_timeouts() {
    let server = start(&[
        ("ASSETS_PERFORMANCE__READ_TIMEOUT", "1"),
        ("ASSETS_PERFORMANCE__KEEP_ALIVE_TIMEOUT", "1"),
    ])
    .await;
    let size = 16 * 1024 * 1024;
    std::fs::write(server.root.path().join("big.bin"), vec![7u8; size]).unwrap();

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(get("/big.bin", "").as_bytes())
        .await
        .unwrap();

    // Stall well past both timeouts before reading anything
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    assert!(buf.starts_with(b"HTTP/1.1 200"));
    assert_eq!(buf.len() - head_end, size);
}
