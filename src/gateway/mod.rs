//! Optional side channels around the color computation.
//!
//! Both gateways wrap an optional backend. A disabled gateway behaves like a
//! backend that always misses and silently drops writes. Backend failures are
//! logged here and reported as outcomes, never as errors, so callers cannot
//! accidentally let them fail a request.
//!
//! - [`CacheGateway`]: read-through/write-through cache keyed by [`Fingerprint`]
//! - [`StoreGateway`]: append-only log of `(url, color)` records

mod cache;
mod fingerprint;
mod store;

pub use cache::{CacheGateway, CacheLookup, ColorCache, MemoryColorCache, DEFAULT_CACHE_CAPACITY};
pub use fingerprint::Fingerprint;
pub use store::{ColorStore, JsonlColorStore, MemoryColorStore, StoreGateway, StoreRecord};

/// Outcome of a best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The backend accepted the write
    Written,

    /// The gateway is disabled
    Skipped,

    /// The backend failed; the failure has been logged
    Failed,
}
