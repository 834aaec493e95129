//! Mean-color reduction and hex serialization.
//!
//! # Numeric rules
//!
//! - Channel sums use `u64`, enough for more than 2^47 pixels at full
//!   intensity, far beyond [`crate::decode::MAX_PIXELS`].
//! - Each sum is divided by the pixel count with truncating integer division.
//! - The mean is normalized by dividing by `65535.0`.
//! - Hex output rounds each normalized channel to one of 256 levels with
//!   round-half-up: `floor(v * 255 + 0.5)`.
//! - Alpha is ignored: transparent pixels count as if they were opaque.

use std::fmt;

use crate::decode::PixelGrid;

// =============================================================================
// ColorResult
// =============================================================================

/// An RGB color with each channel normalized to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorResult {
    r: f64,
    g: f64,
    b: f64,
}

impl ColorResult {
    /// Create a color from normalized channels, clamping into `[0.0, 1.0]`.
    ///
    /// NaN becomes `0.0`.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    /// Create a color from 16-bit channel values.
    pub fn from_rgb16(r: u16, g: u16, b: u16) -> Self {
        Self::new(
            r as f64 / u16::MAX as f64,
            g as f64 / u16::MAX as f64,
            b as f64 / u16::MAX as f64,
        )
    }

    /// Parse a `#rrggbb` string (case-insensitive).
    ///
    /// Returns `None` for anything else, including the 3-digit short form.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }

        let bytes = hex::decode(digits).ok()?;
        Some(Self::new(
            bytes[0] as f64 / 255.0,
            bytes[1] as f64 / 255.0,
            bytes[2] as f64 / 255.0,
        ))
    }

    /// Red channel in `[0.0, 1.0]`.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Green channel in `[0.0, 1.0]`.
    pub fn g(&self) -> f64 {
        self.g
    }

    /// Blue channel in `[0.0, 1.0]`.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// The 8-bit levels used by [`hex`](Self::hex).
    pub fn to_rgb8(&self) -> [u8; 3] {
        [to_level(self.r), to_level(self.g), to_level(self.b)]
    }

    /// Canonical `#rrggbb` form, lowercase.
    pub fn hex(&self) -> String {
        format!("#{}", hex::encode(self.to_rgb8()))
    }
}

impl fmt::Display for ColorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn to_level(v: f64) -> u8 {
    (v * 255.0 + 0.5).floor().clamp(0.0, 255.0) as u8
}

// =============================================================================
// Reduction
// =============================================================================

/// Per-channel truncated mean of red, green and blue over every pixel.
///
/// Returns `None` for an empty grid.
pub fn channel_means(grid: &PixelGrid) -> Option<[u16; 3]> {
    let count = grid.width() as u64 * grid.height() as u64;
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in grid.pixels() {
        let [r, g, b, _alpha] = pixel.0;
        sums[0] += r as u64;
        sums[1] += g as u64;
        sums[2] += b as u64;
    }

    Some(sums.map(|sum| (sum / count) as u16))
}

/// Arithmetic mean color of `grid`, or `None` if it has no pixels.
pub fn mean_color(grid: &PixelGrid) -> Option<ColorResult> {
    let [r, g, b] = channel_means(grid)?;
    Some(ColorResult::from_rgb16(r, g, b))
}

// =============================================================================
// Tests
// =============================================================================
