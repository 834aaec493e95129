//! `reqwest`-backed fetcher with a timeout and a response size cap.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

use super::{FetchedImage, ImageFetcher};

/// Client identity sent to remote hosts. Some image hosts reject requests
/// without a browser-like user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default deadline for a single fetch, connection through last body byte.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default response body cap: 20 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Maximum number of redirects followed per fetch.
pub const MAX_REDIRECTS: usize = 5;

const ACCEPT_IMAGES: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

// =============================================================================
// HttpImageFetcher
// =============================================================================

/// Fetches images over HTTP(S).
///
/// The body is streamed and the fetch fails with
/// [`FetchError::BodyTooLarge`] as soon as it exceeds the configured cap, so
/// an oversized or endless response never gets fully buffered.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpImageFetcher {
    /// Create a fetcher with the default user agent, timeout and body cap.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_BODY_BYTES)
    }

    /// Create a fetcher with custom settings.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - `User-Agent` header sent with every request
    /// * `timeout` - Deadline for a whole fetch
    /// * `max_body_bytes` - Largest accepted response body
    pub fn with_options(
        user_agent: &str,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            max_body_bytes,
        })
    }

    /// The configured body cap.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// The configured fetch deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_reqwest_error(&self, err: reqwest::Error, reading_body: bool) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }
        } else if reading_body {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let parsed = parse_image_url(url)?;

        let mut response = self
            .client
            .get(parsed)
            .header(ACCEPT, ACCEPT_IMAGES)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e, false))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(FetchError::BodyTooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let initial = response
            .content_length()
            .map(|n| n as usize)
            .unwrap_or(0)
            .min(self.max_body_bytes);
        let mut body = BytesMut::with_capacity(initial);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_reqwest_error(e, true))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(
            url = %url,
            bytes = body.len(),
            content_type = ?content_type,
            "Fetched image"
        );

        Ok(FetchedImage {
            bytes: body.freeze(),
            content_type,
        })
    }
}

/// Parse `url`, accepting only `http` and `https`.
pub(crate) fn parse_image_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme {:?}",
            url, other
        ))),
    }
}
