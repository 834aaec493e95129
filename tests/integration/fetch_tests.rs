//! HTTP fetcher integration tests against a local server.
//!
//! Tests verify:
//! - Successful fetches carry the body and content type
//! - Non-2xx status, oversized bodies and slow hosts map to fetch errors
//! - Redirects are followed
//! - The full router computes a color from a real HTTP fetch

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use img2color::error::FetchError;
use img2color::{create_router, ColorService, HttpImageFetcher, ImageFetcher, RouterConfig};

use super::test_utils::{body_color, body_string, color_request, red_png};

const TEST_CAP: usize = 1024;

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/red.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], red_png()) }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "not found").into_response() }),
        )
        .route(
            "/big",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 2 * TEST_CAP]) }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                ([(header::CONTENT_TYPE, "image/png")], red_png())
            }),
        )
        .route("/moved", get(|| async { Redirect::temporary("/red.png") }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A server that streams a chunked body larger than [`TEST_CAP`] without
/// announcing its length.
async fn spawn_chunked_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;

                let head = "HTTP/1.1 200 OK\r\n\
                            Content-Type: image/png\r\n\
                            Transfer-Encoding: chunked\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                let chunk = vec![0xAAu8; 512];
                for _ in 0..8 {
                    let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
                    frame.extend_from_slice(&chunk);
                    frame.extend_from_slice(b"\r\n");
                    if socket.write_all(&frame).await.is_err() {
                        return;
                    }
                }
                let _ = socket.write_all(b"0\r\n\r\n").await;
            });
        }
    });
    addr
}

fn test_fetcher(timeout: Duration) -> HttpImageFetcher {
    HttpImageFetcher::with_options("img2color-test", timeout, TEST_CAP).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let addr = spawn_server().await;
    let fetcher = HttpImageFetcher::new().unwrap();

    let image = fetcher
        .fetch(&format!("http://{}/red.png", addr))
        .await
        .unwrap();

    assert_eq!(image.bytes.as_ref(), red_png().as_slice());
    assert_eq!(image.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_fetch_follows_redirect() {
    let addr = spawn_server().await;
    let fetcher = HttpImageFetcher::new().unwrap();

    let image = fetcher
        .fetch(&format!("http://{}/moved", addr))
        .await
        .unwrap();

    assert_eq!(image.bytes.as_ref(), red_png().as_slice());
}

#[tokio::test]
async fn test_fetch_non_success_status() {
    let addr = spawn_server().await;
    let fetcher = HttpImageFetcher::new().unwrap();

    let err = fetcher
        .fetch(&format!("http://{}/missing", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_fetch_declared_length_over_cap() {
    let addr = spawn_server().await;
    let fetcher = test_fetcher(Duration::from_secs(5));

    let err = fetcher
        .fetch(&format!("http://{}/big", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::BodyTooLarge { limit: TEST_CAP }));
}

#[tokio::test]
async fn test_fetch_streamed_body_over_cap() {
    let addr = spawn_chunked_server().await;
    let fetcher = test_fetcher(Duration::from_secs(5));

    let err = fetcher
        .fetch(&format!("http://{}/stream", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::BodyTooLarge { limit: TEST_CAP }));
}

#[tokio::test]
async fn test_fetch_timeout() {
    let addr = spawn_server().await;
    let fetcher = test_fetcher(Duration::from_millis(200));

    let err = fetcher
        .fetch(&format!("http://{}/slow", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { millis: 200 }));
    assert_eq!(err.to_string(), "Fetch timed out after 200ms");
}

#[tokio::test]
async fn test_fetch_rejects_non_http_scheme() {
    let fetcher = HttpImageFetcher::new().unwrap();

    for url in ["ftp://example.com/a.png", "file:///etc/passwd", "not a url"] {
        let err = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)), "{}", url);
    }
}

#[tokio::test]
async fn test_end_to_end_with_http_fetcher() {
    let addr = spawn_server().await;
    let service = ColorService::new(HttpImageFetcher::new().unwrap());
    let router = create_router(service, RouterConfig::new());

    let response = router
        .clone()
        .oneshot(color_request("/api", &format!("http://{}/red.png", addr)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_color(response).await, "#ff0000");

    let response = router
        .oneshot(color_request("/api", &format!("http://{}/missing", addr)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response)
        .await
        .starts_with("failed to extract main color:"));
}
