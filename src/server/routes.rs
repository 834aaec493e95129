//! Router configuration for img2color.
//!
//! This module defines the HTTP routes and applies the referer filter, the
//! CORS response headers and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health              - Health check (never filtered)
//! /api?img=...         - Color endpoint (referer-filtered)
//! /api/img2color?img=  - Color endpoint (referer-filtered)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use img2color::fetch::HttpImageFetcher;
//! use img2color::server::{create_router, RefererPolicy, RouterConfig};
//! use img2color::service::ColorService;
//!
//! let service = ColorService::new(HttpImageFetcher::new()?);
//! let config = RouterConfig::new()
//!     .with_referer_policy(RefererPolicy::from_list("*.example.com")?);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{color_handler, health_handler, preflight_handler, AppState};
use super::referer::{referer_middleware, RefererPolicy};
use crate::fetch::ImageFetcher;
use crate::service::ColorService;

/// `Access-Control-Allow-Origin` value.
pub const CORS_ALLOW_ORIGIN: &str = "*";

/// `Access-Control-Allow-Methods` value.
pub const CORS_ALLOW_METHODS: &str = "GET, OPTIONS";

/// `Access-Control-Allow-Headers` value.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Referer";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Referer allow-list for the color endpoint
    pub referer_policy: RefererPolicy,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration that allows every referer, with tracing on.
    pub fn new() -> Self {
        Self {
            referer_policy: RefererPolicy::allow_all(),
            enable_tracing: true,
        }
    }

    /// Set the referer allow-list.
    pub fn with_referer_policy(mut self, policy: RefererPolicy) -> Self {
        self.referer_policy = policy;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Color routes, filtered by the referer policy
/// - The health route
/// - CORS headers on every response
/// - Request tracing (optional)
pub fn create_router<F>(color_service: ColorService<F>, config: RouterConfig) -> Router
where
    F: ImageFetcher + 'static,
{
    create_shared_router(Arc::new(color_service), config)
}

/// Create the router around a service shared with the caller.
pub fn create_shared_router<F>(color_service: Arc<ColorService<F>>, config: RouterConfig) -> Router
where
    F: ImageFetcher + 'static,
{
    let app_state = AppState::with_shared_service(color_service);

    let color_routes = Router::new()
        .route(
            "/api",
            get(color_handler::<F>).options(preflight_handler),
        )
        .route(
            "/api/img2color",
            get(color_handler::<F>).options(preflight_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            config.referer_policy.clone(),
            referer_middleware,
        ))
        .with_state(app_state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_handler::<F>))
        .with_state(app_state);

    let router = with_cors_headers(Router::new().merge(color_routes).merge(public_routes));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Set the fixed CORS headers on every response, errors included.
fn with_cors_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(CORS_ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
}

// =============================================================================
// Tests
// =============================================================================
