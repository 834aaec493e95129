//! Remote image acquisition.
//!
//! [`ImageFetcher`] is the seam between the color pipeline and the network.
//! [`HttpImageFetcher`] is the production implementation; tests substitute
//! in-memory fetchers.

mod client;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use self::client::{
    HttpImageFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT,
    MAX_REDIRECTS,
};

/// A fetched response body with its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// The complete response body
    pub bytes: Bytes,

    /// The `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
}

impl FetchedImage {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Something that can retrieve the bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource at `url`.
    ///
    /// Implementations must return an error for non-2xx responses.
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}
