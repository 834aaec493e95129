//! Color cache keyed by URL fingerprint.
//!
//! [`ColorCache`] is the backend seam; [`MemoryColorCache`] is the in-process
//! LRU implementation. [`CacheGateway`] wraps an optional backend and turns
//! every backend failure into a logged miss or a logged skipped write.
//!
//! Entries never expire. A remote image that changes keeps its old color
//! until the entry is evicted by capacity.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::color::ColorResult;
use crate::error::CacheError;

use super::{Fingerprint, WriteOutcome};

/// Default maximum number of cached colors.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

// =============================================================================
// Backend Trait
// =============================================================================

/// A key-value backend storing `#rrggbb` strings by fingerprint.
#[async_trait]
pub trait ColorCache: Send + Sync {
    /// Look up the cached value for `key`.
    async fn get(&self, key: &Fingerprint) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: Fingerprint, value: String) -> Result<(), CacheError>;
}

// =============================================================================
// In-Memory Cache
// =============================================================================

/// In-process LRU cache bounded by entry count.
///
/// # Example
///
/// ```
/// use img2color::gateway::{ColorCache, Fingerprint, MemoryColorCache};
///
/// #[tokio::main]
/// async fn main() {
///     let cache = MemoryColorCache::with_capacity(100);
///     let key = Fingerprint::of("https://example.com/cat.png");
///
///     cache.put(key.clone(), "#336699".to_string()).await.unwrap();
///     assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("#336699"));
/// }
/// ```
pub struct MemoryColorCache {
    cache: RwLock<LruCache<Fingerprint, String>>,
}

impl MemoryColorCache {
    /// Create a cache holding up to [`DEFAULT_CACHE_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache holding up to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Check if `key` is cached without updating LRU order.
    pub async fn contains(&self, key: &Fingerprint) -> bool {
        self.cache.read().await.contains(key)
    }

    /// Remove `key`, returning its value.
    pub async fn remove(&self, key: &Fingerprint) -> Option<String> {
        self.cache.write().await.pop(key)
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Maximum number of entries.
    pub async fn capacity(&self) -> usize {
        self.cache.read().await.cap().get()
    }
}

impl Default for MemoryColorCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColorCache for MemoryColorCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<String>, CacheError> {
        // LRU promotion needs the write lock
        let mut cache = self.cache.write().await;
        Ok(cache.get(key).cloned())
    }

    async fn put(&self, key: Fingerprint, value: String) -> Result<(), CacheError> {
        self.cache.write().await.put(key, value);
        Ok(())
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Result of a cache lookup through [`CacheGateway`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheLookup {
    /// A well-formed color was cached
    Hit(ColorResult),

    /// Nothing usable was cached (absent or malformed entry)
    Miss,

    /// The cache is disabled or the backend failed
    Unavailable,
}

/// Optional cache in front of the color computation.
#[derive(Clone, Default)]
pub struct CacheGateway {
    backend: Option<Arc<dyn ColorCache>>,
}

impl CacheGateway {
    /// A gateway that never hits and drops every write.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// A gateway backed by `backend`.
    pub fn new(backend: Arc<dyn ColorCache>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Check if a backend is configured.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Look up the color cached for `key`.
    ///
    /// A malformed cached value is treated as a miss so the entry gets
    /// recomputed and overwritten.
    pub async fn lookup(&self, key: &Fingerprint) -> CacheLookup {
        let Some(backend) = &self.backend else {
            return CacheLookup::Unavailable;
        };

        match backend.get(key).await {
            Ok(Some(value)) => match ColorResult::from_hex(&value) {
                Some(color) => {
                    debug!(fingerprint = %key, color = %value, "Cache hit");
                    CacheLookup::Hit(color)
                }
                None => {
                    let err = CacheError::Malformed(value);
                    warn!(fingerprint = %key, error = %err, "Ignoring cached value");
                    CacheLookup::Miss
                }
            },
            Ok(None) => {
                debug!(fingerprint = %key, "Cache miss");
                CacheLookup::Miss
            }
            Err(err) => {
                warn!(fingerprint = %key, error = %err, "Cache lookup failed");
                CacheLookup::Unavailable
            }
        }
    }

    /// Write the canonical hex form of `color` under `key`.
    pub async fn store(&self, key: Fingerprint, color: &ColorResult) -> WriteOutcome {
        let Some(backend) = &self.backend else {
            return WriteOutcome::Skipped;
        };

        let fingerprint = key.to_string();
        match backend.put(key, color.hex()).await {
            Ok(()) => WriteOutcome::Written,
            Err(err) => {
                warn!(fingerprint = %fingerprint, error = %err, "Cache write failed");
                WriteOutcome::Failed
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
