//! API integration tests for the color endpoint and error handling.
//!
//! Tests verify:
//! - Color retrieval on both endpoint paths
//! - Error cases (missing parameter, fetch failure, non-image body)
//! - CORS headers and preflight
//! - Health endpoint

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use img2color::{create_router, ColorService, RouterConfig};

use super::test_utils::{
    body_bytes, body_color, body_string, color_request, quadrants_png, red_png,
    MockImageFetcher,
};

const RED_URL: &str = "https://images.example.com/red.png";
const QUAD_URL: &str = "https://images.example.com/quadrants.png";
const TEXT_URL: &str = "https://images.example.com/readme.txt";

fn test_router() -> axum::Router {
    let fetcher = MockImageFetcher::new()
        .with_image(RED_URL, red_png(), Some("image/png"))
        .with_image(QUAD_URL, quadrants_png(), Some("image/png"))
        .with_image(
            TEXT_URL,
            b"this is plain text, not an image".to_vec(),
            Some("text/plain; charset=utf-8"),
        );
    create_router(ColorService::new(fetcher), RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Color Retrieval
// =============================================================================

#[tokio::test]
async fn test_color_success() {
    let router = test_router();

    let response = router.oneshot(color_request("/api", RED_URL)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(response.headers().get("x-color-cache-hit").unwrap(), "false");

    let body = body_string(response).await;
    assert_eq!(body, r##"{"RGB":"#ff0000"}"##);
}

#[tokio::test]
async fn test_img2color_path_variant() {
    let router = test_router();

    let response = router
        .oneshot(color_request("/api/img2color", QUAD_URL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_color(response).await, "#404040");
}

#[tokio::test]
async fn test_url_with_query_string() {
    let url = "https://images.example.com/red.png?size=large&v=2";
    let fetcher = MockImageFetcher::new().with_image(url, red_png(), None);
    let router = create_router(ColorService::new(fetcher), RouterConfig::new());

    let response = router.oneshot(color_request("/api", url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_color(response).await, "#ff0000");
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_img_parameter() {
    let router = test_router();

    let request = Request::builder().uri("/api").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("img"));
}

#[tokio::test]
async fn test_empty_img_parameter() {
    let router = test_router();

    let request = Request::builder()
        .uri("/api?img=")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plain_text_body_is_server_error() {
    let router = test_router();

    let response = router.oneshot(color_request("/api", TEXT_URL)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = body_string(response).await;
    assert!(body.starts_with("failed to extract main color:"));
    assert!(body.contains("Unsupported image format"));
}

#[tokio::test]
async fn test_fetch_failure_is_server_error() {
    let router = test_router();

    let response = router
        .oneshot(color_request("/api", "https://images.example.com/missing.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("404"));
}

#[tokio::test]
async fn test_unknown_route() {
    let router = test_router();

    let request = Request::builder()
        .uri("/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// CORS
// =============================================================================

fn assert_cors_headers(response: &axum::http::Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, OPTIONS"
    );
    assert!(headers
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Content-Type"));
}

#[tokio::test]
async fn test_preflight() {
    let router = test_router();

    for path in ["/api", "/api/img2color"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert_cors_headers(&response);
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let router = test_router();

    let ok = router
        .clone()
        .oneshot(color_request("/api", RED_URL))
        .await
        .unwrap();
    assert_cors_headers(&ok);

    let bad = router
        .clone()
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_cors_headers(&bad);

    let failed = router
        .oneshot(color_request("/api", TEXT_URL))
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors_headers(&failed);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let router = test_router();

    router
        .clone()
        .oneshot(color_request("/api", RED_URL))
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["cache_enabled"], false);
    assert_eq!(json["store_enabled"], false);
    assert_eq!(json["in_flight"], 0);
    assert_eq!(json["stats"]["computations"], 1);
}
