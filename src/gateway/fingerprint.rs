//! Cache keys derived from image URLs.

use std::fmt;

use sha2::{Digest, Sha256};

/// Cache key derived from an image URL.
///
/// The lowercase hex SHA-256 of the URL's UTF-8 bytes. The URL is hashed
/// exactly as received, so URLs differing only in whitespace or query order
/// get different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an image URL.
    pub fn of(url: &str) -> Self {
        Self(hex::encode(Sha256::digest(url.as_bytes())))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
