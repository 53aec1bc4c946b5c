//! Compression engine: re-encode a document to reduce its size.
//!
//! Every pass collapses structurally identical objects, drops unreferenced
//! ones and Flate-compresses streams. Quality below 70 additionally
//! resamples embedded raster images.

mod images;
pub mod compressor;

pub use compressor::{CompressOutput, CompressionReport, Compressor};

use crate::config::CompressOptions;
use crate::error::Result;

/// Compress a buffer with a default [`Compressor`].
///
/// # Errors
///
/// See [`Compressor::compress`].
pub fn compress(source: &[u8], options: &CompressOptions) -> Result<CompressOutput> {
    Compressor::new().compress(source, options)
}
