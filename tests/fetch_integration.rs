//! Integration tests for the fetch layer.
//!
//! These tests verify the fetch policy against mock HTTP servers: header
//! passthrough, Content-Disposition naming, non-200 handling, and the
//! single fixed-delay retry on transport failures.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gallerist_core::fetch::{CookieInput, FetchClient, NameSource};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_download_writes_body_to_destination() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let url = format!("{}/files/photo.jpg", mock_server.uri());
    let (status, written) = client
        .download_file(&url, temp_dir.path(), "photo.jpg", NameSource::Url, None)
        .await
        .expect("download should succeed");

    assert_eq!(status.as_u16(), 200);
    let written = written.expect("path should be returned");
    assert_eq!(std::fs::read(&written).unwrap(), b"jpeg bytes");
    assert_eq!(written, temp_dir.path().join("photo.jpg"));
}

#[tokio::test]
async fn test_download_content_naming_uses_disposition_header() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/1234"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="real-name.png""#)
                .set_body_bytes(b"png".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let url = format!("{}/files/1234", mock_server.uri());
    let (_, written) = client
        .download_file(&url, temp_dir.path(), "fallback.png", NameSource::Content, None)
        .await
        .expect("download should succeed");

    assert_eq!(written.unwrap(), temp_dir.path().join("real-name.png"));
}

#[tokio::test]
async fn test_download_content_naming_falls_back_without_header() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let url = format!("{}/files/1234", mock_server.uri());
    let (_, written) = client
        .download_file(&url, temp_dir.path(), "fallback.png", NameSource::Content, None)
        .await
        .expect("download should succeed");

    assert_eq!(written.unwrap(), temp_dir.path().join("fallback.png"));
}

#[tokio::test]
async fn test_download_url_naming_ignores_disposition_header() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/photo.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="other.png""#)
                .set_body_bytes(b"jpeg".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let url = format!("{}/files/photo.jpg", mock_server.uri());
    let (_, written) = client
        .download_file(&url, temp_dir.path(), "photo.jpg", NameSource::Url, None)
        .await
        .expect("download should succeed");

    assert_eq!(written.unwrap(), temp_dir.path().join("photo.jpg"));
}

#[tokio::test]
async fn test_download_non_200_returns_no_path_and_writes_nothing() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let url = format!("{}/files/missing.jpg", mock_server.uri());
    let (status, written) = client
        .download_file(&url, temp_dir.path(), "missing.jpg", NameSource::Url, None)
        .await
        .expect("lenient download should not error");

    assert_eq!(status.as_u16(), 404);
    assert!(written.is_none());
    assert!(!temp_dir.path().join("missing.jpg").exists());
}

#[tokio::test]
async fn test_fetch_bytes_empty_on_non_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_bytes(b"not found".to_vec()))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let bytes = client
        .fetch_bytes(&format!("{}/gone", mock_server.uri()))
        .await
        .expect("lenient fetch should not error");
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_fetch_strict_mode_raises_on_non_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = FetchClient::new();
    let result = client.fetch(&format!("{}/gone", mock_server.uri()), true).await;
    let error = result.expect_err("strict fetch must raise");
    assert!(error.to_string().contains("500"), "got: {error}");
}

#[tokio::test]
async fn test_requests_carry_cookies_keepalive_and_referer() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/files/a.jpg"))
        .and(header("cookie", "session=abc"))
        .and(header("connection", "keep-alive"))
        .and(header("referer", "https://example.com/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut cookies = HashMap::new();
    cookies.insert("session".to_string(), "abc".to_string());
    let client = FetchClient::with_cookies(Some(CookieInput::Map(cookies)));
    let url = format!("{}/files/a.jpg", mock_server.uri());
    let (status, written) = client
        .download_file(
            &url,
            temp_dir.path(),
            "a.jpg",
            NameSource::Url,
            Some("https://example.com/gallery"),
        )
        .await
        .expect("download should succeed");

    assert_eq!(status.as_u16(), 200);
    assert!(written.is_some());
}

#[tokio::test]
async fn test_cookie_header_string_is_parsed_and_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"page".to_vec()))
        .mount(&mock_server)
        .await;

    let client = FetchClient::with_cookies(Some(CookieInput::Header("session=abc".to_string())));
    let bytes = client
        .fetch_bytes(&format!("{}/page", mock_server.uri()))
        .await
        .expect("fetch should succeed");
    assert_eq!(bytes, b"page");
}

/// Serves one dropped connection, then a real HTTP 200 response.
async fn flaky_then_ok_server() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        // First connection: accept and drop before answering.
        if let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
        // Second connection: minimal valid response.
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

#[tokio::test]
async fn test_transport_failure_retries_once_after_fixed_delay() {
    let addr = flaky_then_ok_server().await;
    let retry_delay = Duration::from_millis(200);
    let client = FetchClient::new().with_retry_delay(retry_delay);

    let started = Instant::now();
    let bytes = client
        .fetch_bytes(&format!("http://{addr}/page"))
        .await
        .expect("second attempt should succeed");
    let elapsed = started.elapsed();

    assert_eq!(bytes, b"ok", "retry must return the successful body");
    assert!(
        elapsed >= retry_delay,
        "the fixed delay must pass before the retry: {elapsed:?}"
    );
    assert!(
        elapsed < retry_delay * 8,
        "only one delay may occur: {elapsed:?}"
    );
}

#[tokio::test]
async fn test_second_transport_failure_is_fatal() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind probe listener");
    let addr = listener.local_addr().expect("listener has an address");
    drop(listener);

    let client = FetchClient::new().with_retry_delay(Duration::from_millis(10));
    let result = client.fetch_bytes(&format!("http://{addr}/page")).await;
    let error = result.expect_err("both attempts fail, the error must propagate");
    assert!(
        error.to_string().contains("network error"),
        "got: {error}"
    );
}
