//! Format and color fixture integration tests.
//!
//! Tests verify:
//! - Every supported format reduces to the expected color
//! - Format detection ignores a wrong or missing Content-Type
//! - Large images are downscaled without changing a uniform color
//! - Corrupt and empty bodies fail with a decode error

use axum::http::StatusCode;
use image::codecs::gif::GifEncoder;
use image::{Frame, ImageFormat, Rgba, RgbaImage};
use tower::ServiceExt;

use img2color::color::ColorResult;
use img2color::{create_router, ColorService, RouterConfig};

use super::test_utils::{
    body_color, body_string, color_request, encode, quadrants_png, red_png, solid_rgb,
    solid_rgba, MockImageFetcher,
};

const URL: &str = "https://images.example.com/fixture";

async fn color_of(data: Vec<u8>, content_type: Option<&str>) -> (StatusCode, String) {
    let fetcher = MockImageFetcher::new().with_image(URL, data, content_type);
    let router = create_router(ColorService::new(fetcher), RouterConfig::new());

    let response = router.oneshot(color_request("/api", URL)).await.unwrap();
    let status = response.status();
    if status == StatusCode::OK {
        (status, body_color(response).await)
    } else {
        (status, body_string(response).await)
    }
}

// =============================================================================
// Color Fixtures
// =============================================================================

#[tokio::test]
async fn test_uniform_red_fixture() {
    let (status, color) = color_of(red_png(), Some("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");
}

#[tokio::test]
async fn test_mixed_quadrants_fixture() {
    let (status, color) = color_of(quadrants_png(), Some("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#404040");
}

#[tokio::test]
async fn test_large_image_is_downscaled() {
    let data = encode(&solid_rgba(1200, 800, [0, 128, 255, 255]), ImageFormat::Png);
    let (status, color) = color_of(data, Some("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#0080ff");
}

#[tokio::test]
async fn test_transparency_is_ignored() {
    let data = encode(&solid_rgba(4, 4, [0, 255, 0, 0]), ImageFormat::Png);
    let (status, color) = color_of(data, Some("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#00ff00");
}

// =============================================================================
// Supported Formats
// =============================================================================

#[tokio::test]
async fn test_gif_single_frame() {
    let data = encode(&solid_rgba(8, 8, [255, 0, 0, 255]), ImageFormat::Gif);
    let (status, color) = color_of(data, Some("image/gif")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");
}

#[tokio::test]
async fn test_animated_gif_uses_first_frame() {
    let frames = vec![
        Frame::new(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]))),
        Frame::new(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]))),
    ];
    let mut data = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut data);
        encoder.encode_frames(frames).unwrap();
    }

    let (status, color) = color_of(data, Some("image/gif")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");
}

#[tokio::test]
async fn test_webp() {
    let data = encode(&solid_rgba(8, 8, [0, 0, 255, 255]), ImageFormat::WebP);
    let (status, color) = color_of(data, Some("image/webp")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#0000ff");
}

#[tokio::test]
async fn test_jpeg_is_close_to_source() {
    let data = encode(&solid_rgb(64, 64, [200, 100, 50]), ImageFormat::Jpeg);
    let (status, hex) = color_of(data, Some("image/jpeg")).await;
    assert_eq!(status, StatusCode::OK);

    let [r, g, b] = ColorResult::from_hex(&hex).unwrap().to_rgb8();
    assert!(r.abs_diff(200) <= 4, "{}", hex);
    assert!(g.abs_diff(100) <= 4, "{}", hex);
    assert!(b.abs_diff(50) <= 4, "{}", hex);
}

// =============================================================================
// Content-Type Handling
// =============================================================================

#[tokio::test]
async fn test_missing_content_type() {
    let (status, color) = color_of(red_png(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");
}

#[tokio::test]
async fn test_mislabelled_content_type() {
    let (status, color) = color_of(red_png(), Some("application/octet-stream")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");

    let (status, color) = color_of(red_png(), Some("image/jpeg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color, "#ff0000");
}

// =============================================================================
// Decode Failures
// =============================================================================

#[tokio::test]
async fn test_html_body() {
    let (status, body) = color_of(
        b"<!doctype html><html><body>Not found</body></html>".to_vec(),
        Some("text/html"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Unsupported image format"));
}

#[tokio::test]
async fn test_truncated_png() {
    let data = encode(&solid_rgba(32, 32, [1, 2, 3, 255]), ImageFormat::Png);
    let truncated = data[..data.len() / 2].to_vec();

    let (status, body) = color_of(truncated, Some("image/png")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Corrupt image data"));
}

#[tokio::test]
async fn test_empty_body() {
    let (status, body) = color_of(Vec::new(), Some("image/png")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Empty response body"));
}

#[tokio::test]
async fn test_unregistered_format() {
    // BMP signature; no BMP decoder is registered
    let mut data = b"BM".to_vec();
    data.extend_from_slice(&[0u8; 64]);

    let (status, body) = color_of(data, Some("image/bmp")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Unsupported image format"));
}
