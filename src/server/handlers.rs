//! HTTP request handlers for the color API.
//!
//! # Endpoints
//!
//! - `GET /api?img=<url>` - Mean color of a remote image
//! - `GET /api/img2color?img=<url>` - Same as `/api`
//! - `OPTIONS /api`, `OPTIONS /api/img2color` - CORS preflight
//! - `GET /health` - Health check with side-channel counters

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::color::ColorResult;
use crate::error::{ColorError, DecodeError, FetchError};
use crate::fetch::ImageFetcher;
use crate::service::{ColorRequest, ColorService, StatsSnapshot};

/// Response header reporting whether the color came from the cache.
pub const CACHE_HIT_HEADER: &str = "X-Color-Cache-Hit";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the color service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: ImageFetcher> {
    pub color_service: Arc<ColorService<F>>,
}

impl<F: ImageFetcher> AppState<F> {
    pub fn new(color_service: ColorService<F>) -> Self {
        Self::with_shared_service(Arc::new(color_service))
    }

    pub fn with_shared_service(color_service: Arc<ColorService<F>>) -> Self {
        Self { color_service }
    }
}

impl<F: ImageFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            color_service: Arc::clone(&self.color_service),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for color requests.
#[derive(Debug, Deserialize)]
pub struct ColorQueryParams {
    /// Image URL
    #[serde(default)]
    pub img: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Success body: `{"RGB":"#rrggbb"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBody {
    #[serde(rename = "RGB")]
    pub rgb: String,
}

impl From<&ColorResult> for ColorBody {
    fn from(color: &ColorResult) -> Self {
        Self { rgb: color.hex() }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    pub cache_enabled: bool,

    pub store_enabled: bool,

    /// Computations currently running
    pub in_flight: usize,

    /// Side-channel counters
    pub stats: StatsSnapshot,
}

// =============================================================================
// Error Handling
// =============================================================================

impl ColorError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ColorError::MissingImage => StatusCode::BAD_REQUEST,
            ColorError::ForbiddenReferer { .. } => StatusCode::FORBIDDEN,
            ColorError::Fetch(_)
            | ColorError::Decode(_)
            | ColorError::Timeout { .. }
            | ColorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ColorError::MissingImage => "missing_image",
            ColorError::ForbiddenReferer { .. } => "forbidden_referer",
            ColorError::Fetch(FetchError::Timeout { .. }) | ColorError::Timeout { .. } => {
                "timeout"
            }
            ColorError::Fetch(FetchError::BodyTooLarge { .. }) => "body_too_large",
            ColorError::Fetch(_) => "fetch_error",
            ColorError::Decode(DecodeError::UnsupportedFormat { .. }) => "unsupported_format",
            ColorError::Decode(DecodeError::TooLarge(_)) => "image_too_large",
            ColorError::Decode(_) => "decode_error",
            ColorError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ColorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let message = match &self {
            ColorError::MissingImage => "Missing img parameter".to_string(),
            ColorError::ForbiddenReferer { .. } => "Forbidden".to_string(),
            other => format!("failed to extract main color: {}", other),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        (status, message).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle color requests.
///
/// # Endpoint
///
/// `GET /api?img=<url>` (also served at `/api/img2color`)
///
/// # Response
///
/// - `200 OK`: `{"RGB":"#rrggbb"}` with `Content-Type: application/json`
/// - `400 Bad Request`: Missing or empty `img` parameter
/// - `403 Forbidden`: Referer not in the allow-list
/// - `500 Internal Server Error`: Fetch, decode or timeout failure
///
/// # Headers
///
/// - `X-Color-Cache-Hit: true|false`
pub async fn color_handler<F: ImageFetcher + 'static>(
    State(state): State<AppState<F>>,
    Query(query): Query<ColorQueryParams>,
) -> Result<Response, ColorError> {
    let url = query
        .img
        .filter(|img| !img.is_empty())
        .ok_or(ColorError::MissingImage)?;

    let response = state
        .color_service
        .get_color(ColorRequest::new(url))
        .await?;

    Ok((
        StatusCode::OK,
        [(CACHE_HIT_HEADER, response.cache_hit.to_string())],
        Json(ColorBody::from(&response.color)),
    )
        .into_response())
}

/// Handle CORS preflight with an empty `200 OK`.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "cache_enabled": true,
///   "store_enabled": false,
///   "in_flight": 0,
///   "stats": { "cache_hits": 3, "cache_misses": 1, ... }
/// }
/// ```
pub async fn health_handler<F: ImageFetcher + 'static>(
    State(state): State<AppState<F>>,
) -> Json<HealthResponse> {
    let service = &state.color_service;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_enabled: service.cache_enabled(),
        store_enabled: service.store_enabled(),
        in_flight: service.in_flight(),
        stats: service.stats().snapshot(),
    })
}

// =============================================================================
// Tests
// =============================================================================
