//! Re-encoding documents for size.

use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::codec::{PdfReader, PdfWriter};
use crate::compress::images::resample_images;
use crate::config::CompressOptions;
use crate::error::Result;
use crate::utils::format_megabytes;

/// What a compression pass achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionReport {
    /// Source size in bytes.
    pub original_size: u64,

    /// Result size in bytes.
    pub compressed_size: u64,

    /// Page count (unchanged by compression).
    pub page_count: usize,

    /// Indirect objects collapsed by deduplication.
    pub objects_deduplicated: usize,

    /// Raster images replaced by smaller resampled versions.
    pub images_resampled: usize,
}

impl CompressionReport {
    /// `(original - compressed) / original * 100`.
    ///
    /// Negative when the result grew; `0.0` for an empty original.
    pub fn percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        let original = self.original_size as f64;
        (original - self.compressed_size as f64) / original * 100.0
    }

    /// [`percent`](Self::percent) rounded to an integer, halves rounding up.
    pub fn rounded_percent(&self) -> i64 {
        (self.percent() + 0.5).floor() as i64
    }

    /// Human-readable summary, e.g. `Reduced from 2.4 MB to 1.1 MB (54% reduction)`.
    pub fn summary(&self) -> String {
        format!(
            "Reduced from {} to {} ({}% reduction)",
            format_megabytes(self.original_size),
            format_megabytes(self.compressed_size),
            self.rounded_percent()
        )
    }
}

/// Result of a compress operation.
#[derive(Debug, Clone)]
pub struct CompressOutput {
    /// The re-encoded document.
    pub bytes: Vec<u8>,

    /// What the pass achieved.
    pub report: CompressionReport,
}

/// PDF compressor.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    reader: PdfReader,
    writer: PdfWriter,
}

impl Compressor {
    /// Create a compressor using structural deduplication.
    pub fn new() -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::optimized(),
        }
    }

    /// Compress `source`.
    ///
    /// Below quality 70 embedded images are resampled first; at 70 and above
    /// the transformation is lossless. The result is not guaranteed to be
    /// smaller than the source.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the source does not decode and
    /// `CodecEncodeFailure` if the result cannot be encoded.
    pub fn compress(&self, source: &[u8], options: &CompressOptions) -> Result<CompressOutput> {
        let start = Instant::now();
        let mut document = self.reader.decode(source, 0)?;

        let images_resampled = if options.quality.resamples_images() {
            resample_images(document.inner_mut(), options.quality)
        } else {
            0
        };

        let encoded = self.writer.encode_with_report(document)?;

        let report = CompressionReport {
            original_size: source.len() as u64,
            compressed_size: encoded.bytes.len() as u64,
            page_count: encoded.page_count,
            objects_deduplicated: encoded.objects_deduplicated,
            images_resampled,
        };

        info!(
            quality = options.quality.get(),
            original = report.original_size,
            compressed = report.compressed_size,
            percent = report.percent(),
            deduplicated = report.objects_deduplicated,
            images = images_resampled,
            elapsed = ?start.elapsed(),
            "compressed document"
        );

        Ok(CompressOutput {
            bytes: encoded.bytes,
            report,
        })
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::test_support::{labelled_pdf, markers_of};
    use crate::config::Quality;
    use crate::error::PdfOpsError;
    use rstest::rstest;

    fn report(original_size: u64, compressed_size: u64) -> CompressionReport {
        CompressionReport {
            original_size,
            compressed_size,
            page_count: 1,
            objects_deduplicated: 0,
            images_resampled: 0,
        }
    }

    #[rstest]
    #[case(1000, 250, 75.0)]
    #[case(1000, 1000, 0.0)]
    #[case(1000, 1200, -20.0)]
    #[case(0, 500, 0.0)]
    fn test_percent_is_unclamped(#[case] original: u64, #[case] compressed: u64, #[case] expected: f64) {
        assert!((report(original, compressed).percent() - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(1000, 455, 55)]
    #[case(1000, 1025, -2)]
    #[case(1000, 1035, -3)]
    fn test_rounded_percent(#[case] original: u64, #[case] compressed: u64, #[case] expected: i64) {
        assert_eq!(report(original, compressed).rounded_percent(), expected);
    }

    #[test]
    fn test_summary() {
        let summary = report(2_516_582, 1_153_434).summary();
        assert_eq!(summary, "Reduced from 2.4 MB to 1.1 MB (54% reduction)");
    }

    #[test]
    fn test_compress_keeps_pages() {
        let source = labelled_pdf("A", 5);
        let output = Compressor::new()
            .compress(&source, &CompressOptions::default())
            .unwrap();

        assert_eq!(output.report.page_count, 5);
        assert_eq!(markers_of(&output.bytes), markers_of(&source));
        assert_eq!(output.report.images_resampled, 0);
    }

    #[test]
    fn test_compress_twice_is_safe() {
        let once = Compressor::new()
            .compress(&labelled_pdf("A", 3), &CompressOptions::default())
            .unwrap();
        let twice = Compressor::new()
            .compress(&once.bytes, &CompressOptions::default())
            .unwrap();

        assert_eq!(markers_of(&twice.bytes), vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_low_quality_without_images_is_lossless() {
        let options = CompressOptions {
            quality: Quality::new(10).unwrap(),
        };
        let output = Compressor::new()
            .compress(&labelled_pdf("A", 2), &options)
            .unwrap();
        assert_eq!(markers_of(&output.bytes), vec!["A1", "A2"]);
    }

    #[test]
    fn test_compress_malformed() {
        let err = Compressor::new()
            .compress(b"", &CompressOptions::default())
            .unwrap_err();
        assert!(matches!(err, PdfOpsError::MalformedDocument { .. }));
    }
}
