//! Format detection for fetched image bodies.
//!
//! Detection looks at the leading magic bytes first and falls back to the
//! declared `Content-Type` only when the bytes are not recognized.

use image::ImageFormat;

/// Where a detected format came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatEvidence {
    /// Leading signature bytes of the body
    MagicBytes,

    /// The `Content-Type` header supplied by the remote server
    ContentType,
}

/// Result of sniffing a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedFormat {
    /// The detected format tag
    pub format: ImageFormat,

    /// How the format was determined
    pub evidence: FormatEvidence,
}

/// Detect the format of `data`, using `content_type` as a fallback hint.
///
/// Returns `None` when neither the bytes nor the header identify an image
/// format. The returned format may still lack a registered decoder; that
/// decision belongs to [`super::DecoderRegistry`].
pub fn sniff_format(data: &[u8], content_type: Option<&str>) -> Option<SniffedFormat> {
    if let Ok(format) = image::guess_format(data) {
        return Some(SniffedFormat {
            format,
            evidence: FormatEvidence::MagicBytes,
        });
    }

    content_type
        .and_then(format_from_content_type)
        .map(|format| SniffedFormat {
            format,
            evidence: FormatEvidence::ContentType,
        })
}

/// Map a `Content-Type` header value to an image format.
///
/// Parameters (`; charset=...`) and case are ignored. A few non-standard
/// aliases seen in the wild are accepted for JPEG.
pub fn format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "" => None,
        "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
        other => ImageFormat::from_mime_type(other),
    }
}
