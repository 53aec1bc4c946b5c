//! Splitting one document into several.

use std::time::Instant;
use tracing::{debug, info};

use crate::codec::{PdfDocument, PdfReader, PdfWriter};
use crate::config::SplitOptions;
use crate::error::Result;
use crate::split::partition::{Partition, plan};

/// One result document of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    /// Encoded result document.
    pub bytes: Vec<u8>,

    /// Number of pages in the result.
    pub page_count: usize,

    /// 1-based source page numbers, in result order.
    pub pages: Vec<u32>,

    /// Suggested file-name suffix, e.g. `page-3`.
    pub suffix: String,
}

/// PDF splitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitter {
    reader: PdfReader,
    writer: PdfWriter,
}

impl Splitter {
    /// Create a new splitter with default settings.
    pub fn new() -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
        }
    }

    /// Create a splitter that encodes with `writer`.
    pub fn with_writer(writer: PdfWriter) -> Self {
        Self {
            reader: PdfReader::new(),
            writer,
        }
    }

    /// Split `source` according to `options`.
    ///
    /// The source is decoded once; each partition is copied into a fresh
    /// document and encoded. All parts are built before any is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The source fails to decode (`MalformedDocument`)
    /// - A range reaches past the last page (`InvalidRange`)
    /// - Encoding a part fails (`CodecEncodeFailure`)
    pub fn split(&self, source: &[u8], options: &SplitOptions) -> Result<Vec<SplitPart>> {
        let start = Instant::now();

        let document = self.reader.decode(source, 0)?;
        let partitions = plan(document.page_count(), options)?;

        let parts = partitions
            .iter()
            .map(|partition| self.build_part(&document, partition))
            .collect::<Result<Vec<_>>>()?;

        info!(
            mode = options.mode_name(),
            source_pages = document.page_count(),
            parts = parts.len(),
            elapsed = ?start.elapsed(),
            "split document"
        );

        Ok(parts)
    }

    fn build_part(&self, source: &PdfDocument, partition: &Partition) -> Result<SplitPart> {
        let mut part = PdfDocument::with_version(source.version());
        let handles = part.copy_pages(source, &partition.indices())?;
        part.add_pages(&handles)?;

        let page_count = part.page_count();
        let bytes = self.writer.encode(part)?;
        let suffix = partition.suffix();

        debug!(part = %suffix, pages = page_count, bytes = bytes.len(), "built split part");

        Ok(SplitPart {
            bytes,
            page_count,
            pages: partition.pages.clone(),
            suffix,
        })
    }
}
