//! Color extraction pipeline.
//!
//! A decoded [`PixelGrid`] is shrunk to a small fixed width and then reduced
//! to the arithmetic mean of its red, green and blue channels:
//!
//! ```text
//! PixelGrid ──▶ downscale (Lanczos3, width 50) ──▶ mean_color ──▶ ColorResult
//! ```
//!
//! Everything in this module is synchronous and CPU-bound. The service runs
//! it on the blocking thread pool.

mod downscale;
mod reduce;

pub use downscale::{downscale, target_dimensions, DEFAULT_TARGET_WIDTH, RESAMPLE_FILTER};
pub use reduce::{channel_means, mean_color, ColorResult};

use crate::decode::{DecoderRegistry, PixelGrid};
use crate::error::DecodeError;

/// Decode `data`, downscale it to `target_width` and reduce it to its mean color.
///
/// This is the full CPU side of a cache miss.
pub fn extract_color(
    decoders: &DecoderRegistry,
    data: &[u8],
    content_type: Option<&str>,
    target_width: u32,
) -> Result<ColorResult, DecodeError> {
    let grid: PixelGrid = decoders.decode(data, content_type)?;
    let grid = downscale(grid, target_width);
    mean_color(&grid).ok_or(DecodeError::EmptyImage)
}
