//! Aspect-preserving shrink applied before color reduction.
//!
//! The filter is fixed: it changes the final color by a small but
//! deterministic amount, so swapping it changes every cached result.

use image::imageops::{self, FilterType};

use crate::decode::PixelGrid;

/// Width images are shrunk to before averaging.
pub const DEFAULT_TARGET_WIDTH: u32 = 50;

/// Resampling filter used by [`downscale`].
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Compute the output size for a `width` x `height` grid.
///
/// Grids no wider than `target_width` keep their size (no upscaling).
/// Otherwise the width becomes `target_width` and the height is scaled by the
/// same factor, rounded to the nearest integer and never below 1.
pub fn target_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let target_width = target_width.max(1);
    if width <= target_width {
        return (width, height);
    }

    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    let new_height = (scaled as u32).max(1);
    (target_width, new_height)
}

/// Shrink `grid` to `target_width` using [`RESAMPLE_FILTER`].
///
/// Returns the input unchanged when it is already narrow enough.
pub fn downscale(grid: PixelGrid, target_width: u32) -> PixelGrid {
    let (width, height) = grid.dimensions();
    let (new_width, new_height) = target_dimensions(width, height, target_width);

    if (new_width, new_height) == (width, height) {
        return grid;
    }

    imageops::resize(&grid, new_width, new_height, RESAMPLE_FILTER)
}
