//! # img2color
//!
//! An HTTP service that computes the average color of a remote image.
//!
//! Given an image URL, the service fetches the image, decodes it into a
//! 16-bit RGBA grid, shrinks it to a small fixed width and averages every
//! pixel into a single `#rrggbb` color.
//!
//! ## Features
//!
//! - **Format detection**: JPEG, PNG, GIF (first frame) and WebP, detected from magic bytes
//! - **Deterministic output**: fixed Lanczos3 downscale and documented rounding
//! - **Optional caching**: in-memory LRU keyed by a SHA-256 fingerprint of the URL
//! - **Optional persistence**: append-only JSON Lines log of every computed color
//! - **Hardened fetching**: timeouts, body size cap and single-flight deduplication
//! - **Referer filtering**: wildcard allow-list on the `Referer` host
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`decode`] - Format sniffing and the decoder registry
//! - [`color`] - Downscaling and mean-color reduction
//! - [`gateway`] - Optional cache and store side channels
//! - [`fetch`] - Remote image retrieval
//! - [`service`] - The fetch-compute-store orchestrator
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use img2color::{create_router, ColorService, HttpImageFetcher, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ColorService::new(HttpImageFetcher::new()?);
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod color;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use color::{extract_color, mean_color, ColorResult, DEFAULT_TARGET_WIDTH};
pub use config::Config;
pub use decode::{DecoderRegistry, PixelGrid};
pub use error::{CacheError, ColorError, DecodeError, FetchError, StoreError};
pub use fetch::{FetchedImage, HttpImageFetcher, ImageFetcher};
pub use gateway::{
    CacheGateway, ColorCache, ColorStore, Fingerprint, JsonlColorStore, MemoryColorCache,
    MemoryColorStore, StoreGateway, StoreRecord,
};
pub use server::{create_router, create_shared_router, RefererPolicy, RouterConfig};
pub use service::{ColorRequest, ColorResponse, ColorService, SideChannelStats, StatsSnapshot};
