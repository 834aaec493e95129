use thiserror::Error;

/// Errors that can occur while fetching a remote image.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The image URL could not be parsed or uses an unsupported scheme
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    /// DNS, connection or protocol failure
    #[error("Request failed: {0}")]
    Request(String),

    /// The remote host answered with a non-2xx status
    #[error("Remote host returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The remote host did not answer in time
    #[error("Fetch timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The response body exceeded the configured limit
    #[error("Response body exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The connection failed while the body was being read
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Errors that can occur while turning fetched bytes into pixels.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Zero-byte response body
    #[error("Empty response body")]
    EmptyBody,

    /// Neither the magic bytes nor the declared content type name a known decoder
    #[error("Unsupported image format: {reason}")]
    UnsupportedFormat { reason: String },

    /// The data claimed a known format but could not be decoded
    #[error("Corrupt image data: {0}")]
    Corrupt(String),

    /// The image is larger than the decode pixel budget
    #[error("Image too large to decode: {0}")]
    TooLarge(String),

    /// Decoding succeeded but produced a zero-area image
    #[error("Decoded image has no pixels")]
    EmptyImage,
}

/// Request-level errors surfaced by the color endpoint.
#[derive(Debug, Clone, Error)]
pub enum ColorError {
    /// The `img` query parameter is missing or empty (HTTP 400)
    #[error("Missing img parameter")]
    MissingImage,

    /// The caller's Referer is not in the allow-list (HTTP 403)
    #[error("Referer not allowed: {referer}")]
    ForbiddenReferer { referer: String },

    /// Network failure while fetching the image (HTTP 500)
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The fetched bytes could not be decoded (HTTP 500)
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The whole fetch-and-compute pipeline exceeded its deadline (HTTP 500)
    #[error("Color extraction timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// A worker task failed unexpectedly (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of the optional cache backend. Never surfaced to callers.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// The backend returned a value that is not a `#rrggbb` color
    #[error("Malformed cached value: {0:?}")]
    Malformed(String),
}

/// Failure of the optional persistence backend. Never surfaced to callers.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The store could not be opened at startup
    #[error("Failed to open store at {path}: {message}")]
    Open { path: String, message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
