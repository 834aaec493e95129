//! Decoder registry keyed by detected image format.
//!
//! The registry maps an [`ImageFormat`] tag to a decode function. New formats
//! are added with [`DecoderRegistry::register`]; detection itself is handled by
//! [`super::sniff_format`].

use std::collections::HashMap;
use std::io::Cursor;

use image::error::ImageError;
use image::{DynamicImage, ImageBuffer, ImageDecoder, ImageFormat, ImageReader, Limits, Rgba};
use tracing::debug;

use crate::error::DecodeError;

use super::sniff::sniff_format;

/// Decoded raster with 16-bit RGBA samples (0-65535 per channel).
///
/// 8-bit sources are widened by replication (`0xAB` becomes `0xABAB`), so a
/// full-intensity channel is always `65535`.
pub type PixelGrid = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// A function that decodes `data`, already identified as `format`.
pub type DecodeFn = fn(&[u8], ImageFormat) -> Result<DynamicImage, DecodeError>;

/// Largest width or height accepted from a remote image.
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest pixel count accepted from a remote image (32 megapixels).
///
/// Checked against the header before any pixel buffer is allocated, so a
/// tiny, highly compressed body cannot claim a huge raster.
pub const MAX_PIXELS: u64 = 32 * 1024 * 1024;

/// Bytes per pixel of a [`PixelGrid`].
const GRID_BYTES_PER_PIXEL: u64 = 8;

/// Reject `width` x `height` when it exceeds [`MAX_DIMENSION`] or [`MAX_PIXELS`].
pub fn check_pixel_budget(width: u32, height: u32) -> Result<(), DecodeError> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DecodeError::TooLarge(format!(
            "{}x{} exceeds {} pixels per side",
            width, height, MAX_DIMENSION
        )));
    }

    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(DecodeError::TooLarge(format!(
            "{}x{} is {} pixels, limit is {}",
            width, height, pixels, MAX_PIXELS
        )));
    }

    Ok(())
}

// =============================================================================
// Decoder Registry
// =============================================================================

/// Registry of decoders, one per supported format.
///
/// # Example
///
/// ```
/// use img2color::decode::DecoderRegistry;
/// use image::ImageFormat;
///
/// let registry = DecoderRegistry::with_defaults();
/// assert!(registry.supports(ImageFormat::Png));
/// assert!(!registry.supports(ImageFormat::Bmp));
/// ```
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<ImageFormat, DecodeFn>,
}

impl DecoderRegistry {
    /// Create an empty registry that rejects every format.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Create a registry with JPEG, PNG, GIF (first frame) and WebP decoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for format in [
            ImageFormat::Jpeg,
            ImageFormat::Png,
            ImageFormat::Gif,
            ImageFormat::WebP,
        ] {
            registry.register(format, decode_with_image_crate);
        }
        registry
    }

    /// Register a decoder for `format`, returning the one it replaces.
    pub fn register(&mut self, format: ImageFormat, decoder: DecodeFn) -> Option<DecodeFn> {
        self.decoders.insert(format, decoder)
    }

    /// Check whether `format` has a decoder.
    pub fn supports(&self, format: ImageFormat) -> bool {
        self.decoders.contains_key(&format)
    }

    /// Formats with a registered decoder, in no particular order.
    pub fn formats(&self) -> Vec<ImageFormat> {
        self.decoders.keys().copied().collect()
    }

    /// Detect the format of `data` and decode it into a [`PixelGrid`].
    ///
    /// # Errors
    ///
    /// - [`DecodeError::EmptyBody`] for a zero-byte body
    /// - [`DecodeError::UnsupportedFormat`] when no registered decoder matches
    /// - [`DecodeError::TooLarge`] when the header claims more than [`MAX_PIXELS`]
    /// - [`DecodeError::Corrupt`] when the data is truncated or malformed
    /// - [`DecodeError::EmptyImage`] when the image has zero width or height
    pub fn decode(
        &self,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<PixelGrid, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::EmptyBody);
        }

        let sniffed = sniff_format(data, content_type).ok_or_else(|| {
            DecodeError::UnsupportedFormat {
                reason: match content_type {
                    Some(ct) if !ct.is_empty() => {
                        format!("unrecognized data with content type {:?}", ct)
                    }
                    _ => "unrecognized data without content type".to_string(),
                },
            }
        })?;

        let decoder = self.decoders.get(&sniffed.format).ok_or_else(|| {
            DecodeError::UnsupportedFormat {
                reason: format!("no decoder for {:?}", sniffed.format),
            }
        })?;

        debug!(
            format = ?sniffed.format,
            evidence = ?sniffed.evidence,
            bytes = data.len(),
            "Decoding image"
        );

        let img = decoder(data, sniffed.format)?;
        if img.width() == 0 || img.height() == 0 {
            return Err(DecodeError::EmptyImage);
        }

        Ok(img.to_rgba16())
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// Decode Functions
// =============================================================================

/// Decode with the `image` crate, bounded by [`check_pixel_budget`].
///
/// The header is read first and the image rejected before any pixel data
/// is decoded. The decoder's own allocations are capped at the size of the
/// 16-bit grid the pixel budget allows.
///
/// For animated GIFs only the first frame is returned.
pub fn decode_with_image_crate(
    data: &[u8],
    format: ImageFormat,
) -> Result<DynamicImage, DecodeError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_PIXELS * GRID_BYTES_PER_PIXEL);

    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(limits);

    let decoder = reader.into_decoder().map_err(map_image_error)?;
    let (width, height) = decoder.dimensions();
    check_pixel_budget(width, height)?;

    DynamicImage::from_decoder(decoder).map_err(map_image_error)
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Unsupported(e) => DecodeError::UnsupportedFormat {
            reason: e.to_string(),
        },
        ImageError::Limits(e) => DecodeError::TooLarge(e.to_string()),
        other => DecodeError::Corrupt(other.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
