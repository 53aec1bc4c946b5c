//! Encoding documents back to bytes.
//!
//! The writer runs a fixed pipeline over a document before serializing it:
//!
//! 1. Deduplicate structurally identical objects (optional)
//! 2. Prune objects unreachable from the trailer (optional)
//! 3. Flate-compress uncompressed streams (optional)
//! 4. Renumber objects densely
//!
//! Every step is deterministic, so identical graphs encode to identical
//! bytes with the same options.
//!
//! # Examples
//!
//! ```no_run
//! use pdfops::codec::{PdfDocument, PdfWriter};
//!
//! # fn example(document: PdfDocument) -> pdfops::Result<()> {
//! let writer = PdfWriter::new();
//! let bytes = writer.encode(document)?;
//! println!("{} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, error};

use super::dedup::deduplicate;
use super::document::PdfDocument;
use crate::error::{PdfOpsError, Result};
use crate::utils::format_file_size;

/// Encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Flate-compress streams that carry no filter.
    pub compress_streams: bool,

    /// Collapse structurally identical indirect objects.
    pub deduplicate: bool,

    /// Drop objects unreachable from the trailer.
    pub prune_unreferenced: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
            deduplicate: false,
            prune_unreferenced: true,
        }
    }
}

impl WriteOptions {
    /// The structural-deduplication mode used for compression.
    pub fn optimized() -> Self {
        Self {
            compress_streams: true,
            deduplicate: true,
            prune_unreferenced: true,
        }
    }
}

/// What an encode pass did besides producing bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    /// The serialized document.
    pub bytes: Vec<u8>,

    /// Number of pages in the encoded document.
    pub page_count: usize,

    /// Objects removed by deduplication.
    pub objects_deduplicated: usize,

    /// Objects removed by pruning.
    pub objects_pruned: usize,
}

/// Statistics about writing a file to disk.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// PDF encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer in structural-deduplication mode.
    pub fn optimized() -> Self {
        Self::with_options(WriteOptions::optimized())
    }

    /// Writer options.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Encode a document to bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecEncodeFailure` if serialization fails.
    pub fn encode(&self, document: PdfDocument) -> Result<Vec<u8>> {
        Ok(self.encode_with_report(document)?.bytes)
    }

    /// Encode a document and report what the pipeline removed.
    ///
    /// # Errors
    ///
    /// Returns `CodecEncodeFailure` if serialization fails.
    pub fn encode_with_report(&self, document: PdfDocument) -> Result<EncodedDocument> {
        let start = Instant::now();
        let page_count = document.page_count();
        let mut doc = document.into_inner();

        let objects_deduplicated = if self.options.deduplicate {
            deduplicate(&mut doc)
        } else {
            0
        };

        let objects_pruned = if self.options.prune_unreferenced {
            doc.prune_objects().len()
        } else {
            0
        };

        if self.options.compress_streams {
            doc.compress();
        }

        doc.renumber_objects();

        let bytes = serialize(&mut doc)?;

        debug!(
            pages = page_count,
            objects = doc.objects.len(),
            deduplicated = objects_deduplicated,
            pruned = objects_pruned,
            bytes = bytes.len(),
            elapsed = ?start.elapsed(),
            "encoded document"
        );

        Ok(EncodedDocument {
            bytes,
            page_count,
            objects_deduplicated,
            objects_pruned,
        })
    }

    /// Write bytes to `path` atomically.
    ///
    /// The bytes go to a sibling `.tmp` file first, which is then renamed
    /// over `path`, so readers never observe a half-written file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created, written or renamed.
    pub async fn save(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || {
            let start = Instant::now();
            let temp_path = temp_path_for(&path_buf);

            let write = || -> std::io::Result<()> {
                let file = std::fs::File::create(&temp_path)?;
                let mut writer = std::io::BufWriter::new(file);
                writer.write_all(&bytes)?;
                writer.flush()?;
                std::fs::rename(&temp_path, &path_buf)
            };

            if let Err(e) = write() {
                let _ = std::fs::remove_file(&temp_path);
                return Err(PdfOpsError::from(e));
            }

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size: bytes.len() as u64,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| PdfOpsError::internal(format!("Write task failed: {e}")))?
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }
}

fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| {
        error!(
            error = %e,
            objects = doc.objects.len(),
            version = %doc.version,
            "failed to serialize document"
        );
        PdfOpsError::encode_failed(e.to_string())
    })?;
    Ok(bytes)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
