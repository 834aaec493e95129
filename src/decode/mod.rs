//! Image decoding layer.
//!
//! Turns an untrusted byte stream into a [`PixelGrid`], a rectangular raster of
//! 16-bit-per-channel RGBA samples, regardless of the source encoding or bit
//! depth.
//!
//! ```text
//! bytes + Content-Type hint
//!          │
//!          ▼
//! ┌──────────────────┐     ┌─────────────────────────┐
//! │  sniff_format    │ ──▶ │    DecoderRegistry      │ ──▶ PixelGrid
//! │ (magic, then     │     │ ImageFormat → DecodeFn  │
//! │  header hint)    │     └─────────────────────────┘
//! └──────────────────┘
//! ```
//!
//! Magic bytes win over the declared content type because remote servers
//! frequently omit or mislabel it. The header is only consulted when the
//! magic bytes are not recognized.

mod registry;
mod sniff;

pub use registry::{
    check_pixel_budget, decode_with_image_crate, DecodeFn, DecoderRegistry, PixelGrid,
    MAX_DIMENSION, MAX_PIXELS,
};
pub use sniff::{format_from_content_type, sniff_format, FormatEvidence, SniffedFormat};
