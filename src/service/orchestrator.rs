use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::color::{extract_color, ColorResult, DEFAULT_TARGET_WIDTH};
use crate::decode::DecoderRegistry;
use crate::error::ColorError;
use crate::fetch::ImageFetcher;
use crate::gateway::{CacheGateway, CacheLookup, Fingerprint, StoreGateway, WriteOutcome};

use super::flight::{FlightTable, Join};
use super::stats::SideChannelStats;

/// Default deadline for the whole fetch-and-compute pipeline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Color Request
// =============================================================================

/// A request for the mean color of a remote image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRequest {
    /// Image URL, opaque and untrusted
    pub url: String,
}

impl ColorRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Cache key for this request.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.url)
    }
}

// =============================================================================
// Color Response
// =============================================================================

/// Response from the color service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorResponse {
    /// The mean color
    pub color: ColorResult,

    /// Whether the color came from the cache
    pub cache_hit: bool,

    /// Whether this request waited on another request's computation
    pub coalesced: bool,
}

// =============================================================================
// Color Service
// =============================================================================

/// Fetch-compute-store orchestrator.
///
/// For each request:
/// 1. Reject an empty URL
/// 2. Look the fingerprint up in the cache; a hit returns immediately
/// 3. Join or start the single flight for the fingerprint
/// 4. As leader: fetch, decode, downscale and reduce under a deadline
/// 5. Write the cache inline and the store in the background
///
/// Cache and store failures are counted in [`SideChannelStats`] and never
/// change the outcome.
///
/// # Example
///
/// ```ignore
/// use img2color::fetch::HttpImageFetcher;
/// use img2color::service::{ColorRequest, ColorService};
///
/// let service = ColorService::new(HttpImageFetcher::new()?);
/// let response = service.get_color(ColorRequest::new("https://example.com/cat.jpg")).await?;
/// println!("{} (cache hit: {})", response.color, response.cache_hit);
/// ```
pub struct ColorService<F: ImageFetcher> {
    fetcher: Arc<F>,
    cache: CacheGateway,
    store: StoreGateway,
    decoders: Arc<DecoderRegistry>,
    target_width: u32,
    request_timeout: Duration,
    flights: FlightTable,
    stats: Arc<SideChannelStats>,
    background: TaskTracker,
}

impl<F: ImageFetcher> ColorService<F> {
    /// Create a service with no cache and no store.
    pub fn new(fetcher: F) -> Self {
        Self::with_shared_fetcher(Arc::new(fetcher))
    }

    /// Create a service around a fetcher shared with other components.
    pub fn with_shared_fetcher(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            cache: CacheGateway::disabled(),
            store: StoreGateway::disabled(),
            decoders: Arc::new(DecoderRegistry::with_defaults()),
            target_width: DEFAULT_TARGET_WIDTH,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            flights: FlightTable::new(),
            stats: Arc::new(SideChannelStats::new()),
            background: TaskTracker::new(),
        }
    }

    pub fn with_cache(mut self, cache: CacheGateway) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_store(mut self, store: StoreGateway) -> Self {
        self.store = store;
        self
    }

    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = Arc::new(decoders);
        self
    }

    /// Width images are downscaled to before reduction (at least 1).
    pub fn with_target_width(mut self, target_width: u32) -> Self {
        self.target_width = target_width.max(1);
        self
    }

    /// Deadline for fetch plus compute on a cache miss.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn stats(&self) -> &Arc<SideChannelStats> {
        &self.stats
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn store_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Number of store writes still running in the background.
    pub fn pending_writes(&self) -> usize {
        self.background.len()
    }

    /// Wait until every store write spawned so far has finished.
    ///
    /// Called after the server stops accepting requests so the last records
    /// are not lost on shutdown.
    pub async fn wait_for_background_writes(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Get the mean color for a request, using the cache when available.
    ///
    /// # Errors
    ///
    /// - [`ColorError::MissingImage`] for an empty URL
    /// - [`ColorError::Fetch`] when the remote image cannot be retrieved
    /// - [`ColorError::Decode`] when the body is not a decodable image
    /// - [`ColorError::Timeout`] when the pipeline exceeds its deadline
    pub async fn get_color(&self, request: ColorRequest) -> Result<ColorResponse, ColorError> {
        if request.url.is_empty() {
            return Err(ColorError::MissingImage);
        }

        let fingerprint = request.fingerprint();

        match self.cache.lookup(&fingerprint).await {
            CacheLookup::Hit(color) => {
                self.stats.record_cache_hit();
                return Ok(ColorResponse {
                    color,
                    cache_hit: true,
                    coalesced: false,
                });
            }
            CacheLookup::Miss => self.stats.record_cache_miss(),
            CacheLookup::Unavailable if self.cache.is_enabled() => {
                self.stats.record_cache_error()
            }
            CacheLookup::Unavailable => {}
        }

        loop {
            match self.flights.join(&fingerprint) {
                Join::Leader(guard) => {
                    let outcome = self.compute_and_persist(&request.url, &fingerprint).await;
                    guard.finish(outcome.clone());
                    return outcome.map(|color| ColorResponse {
                        color,
                        cache_hit: false,
                        coalesced: false,
                    });
                }
                Join::Follower(flight) => {
                    if let Some(outcome) = flight.wait().await {
                        self.stats.record_coalesced();
                        debug!(url = %request.url, "Shared in-flight computation");
                        return outcome.map(|color| ColorResponse {
                            color,
                            cache_hit: false,
                            coalesced: true,
                        });
                    }
                    debug!(url = %request.url, "In-flight computation abandoned, retrying");
                }
            }
        }
    }

    /// Compute the mean color of `url` without touching cache or store.
    pub async fn compute(&self, url: &str) -> Result<ColorResult, ColorError> {
        tokio::time::timeout(self.request_timeout, self.fetch_and_extract(url))
            .await
            .map_err(|_| ColorError::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            })?
    }

    async fn compute_and_persist(
        &self,
        url: &str,
        fingerprint: &Fingerprint,
    ) -> Result<ColorResult, ColorError> {
        let color = self.compute(url).await?;

        match self.cache.store(fingerprint.clone(), &color).await {
            WriteOutcome::Written => self.stats.record_cache_write(),
            WriteOutcome::Failed => self.stats.record_cache_error(),
            WriteOutcome::Skipped => {}
        }

        self.spawn_store(url, color);

        Ok(color)
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<ColorResult, ColorError> {
        self.stats.record_computation();

        let image = self.fetcher.fetch(url).await?;

        let decoders = self.decoders.clone();
        let target_width = self.target_width;
        let color = tokio::task::spawn_blocking(move || {
            extract_color(
                &decoders,
                &image.bytes,
                image.content_type.as_deref(),
                target_width,
            )
        })
        .await
        .map_err(|e| ColorError::Internal(format!("color task failed: {}", e)))??;

        info!(url = %url, color = %color, "Computed color");
        Ok(color)
    }

    fn spawn_store(&self, url: &str, color: ColorResult) {
        if !self.store.is_enabled() {
            return;
        }

        let store = self.store.clone();
        let stats = self.stats.clone();
        let url = url.to_string();
        self.background.spawn(async move {
            match store.append(&url, &color).await {
                WriteOutcome::Written => stats.record_store_write(),
                WriteOutcome::Failed => stats.record_store_error(),
                WriteOutcome::Skipped => {}
            }
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
