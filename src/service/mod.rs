//! Color service: the fetch-compute-store orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ColorService                            │
//! │  get_color()                                                     │
//! │    1. Validate URL        4. Fetch (ImageFetcher)                │
//! │    2. Cache lookup        5. Decode → downscale → reduce         │
//! │    3. Join single flight  6. Write cache, spawn store append     │
//! └──────────────────────────────────────────────────────────────────┘
//!        │                 │                  │                │
//!        ▼                 ▼                  ▼                ▼
//!  ┌────────────┐   ┌──────────────┐   ┌─────────────┐  ┌──────────────┐
//!  │CacheGateway│   │ ImageFetcher │   │ color::*    │  │ StoreGateway │
//!  └────────────┘   └──────────────┘   └─────────────┘  └──────────────┘
//! ```

mod flight;
mod orchestrator;
mod stats;

pub use orchestrator::{
    ColorRequest, ColorResponse, ColorService, DEFAULT_REQUEST_TIMEOUT,
};
pub use stats::{SideChannelStats, StatsSnapshot};
