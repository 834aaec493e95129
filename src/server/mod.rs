//! HTTP server layer for img2color.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                     GET /api?img=<url>                          │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   referer   │  │        routes           │  │
//! │  │ (requests)  │  │ (allow-list)│  │  (router, CORS headers) │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod referer;
pub mod routes;

pub use handlers::{
    color_handler, health_handler, preflight_handler, AppState, ColorBody, ColorQueryParams,
    HealthResponse, CACHE_HIT_HEADER,
};
pub use referer::{referer_middleware, RefererPolicy};
pub use routes::{
    create_router, create_shared_router, RouterConfig, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS,
    CORS_ALLOW_ORIGIN,
};
