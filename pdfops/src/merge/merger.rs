//! Core PDF merging implementation.
//!
//! Every source is decoded before anything is copied, so a malformed input
//! aborts the merge with no partial result. Pages are copied per source in
//! one call each (sharing that source's resources between its pages) and
//! then attached in the order the merge mode dictates.

use lopdf::ObjectId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::codec::{PageHandle, PdfDocument, PdfReader, PdfWriter};
use crate::config::{MergeMode, MergeOptions};
use crate::error::{PdfOpsError, Result};
use crate::merge::bookmarks::BookmarkManager;
use crate::utils::format_file_size;

/// Fewest sources a merge accepts.
pub const MIN_SOURCES: usize = 2;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Number of source documents merged.
    pub files_merged: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Total size of the source buffers.
    pub input_size: u64,

    /// Size of the merged buffer.
    pub output_size: u64,

    /// Number of outline entries carried over.
    pub bookmarks_added: usize,

    /// Total time taken for merge.
    pub merge_time: Duration,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// Result of a merge operation.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The merged document.
    pub bytes: Vec<u8>,

    /// Page count of the merged document.
    pub page_count: usize,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,
}

/// PDF merger that combines multiple documents.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    reader: PdfReader,
    writer: PdfWriter,
    bookmarks: BookmarkManager,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            bookmarks: BookmarkManager::new(),
        }
    }

    /// Create a merger that encodes with `writer`.
    pub fn with_writer(writer: PdfWriter) -> Self {
        Self {
            writer,
            ..Self::new()
        }
    }

    /// Merge source buffers into one document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Fewer than two sources are given (`InsufficientInputs`)
    /// - Any source fails to decode (`MalformedDocument` naming its index)
    /// - Encoding the result fails (`CodecEncodeFailure`)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfops::merge::Merger;
    /// # use pdfops::config::MergeOptions;
    /// # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfops::Result<()> {
    /// let merger = Merger::new();
    /// let output = merger.merge(&[a, b], &MergeOptions::default())?;
    /// println!("Merged {} files into {} pages",
    ///          output.statistics.files_merged,
    ///          output.page_count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn merge<B: AsRef<[u8]>>(&self, sources: &[B], options: &MergeOptions) -> Result<MergeOutput> {
        let start = Instant::now();

        if sources.len() < MIN_SOURCES {
            return Err(PdfOpsError::InsufficientInputs {
                required: MIN_SOURCES,
                provided: sources.len(),
            });
        }

        let documents = self.reader.decode_all(sources)?;
        let (merged, bookmarks_added) = self.merge_documents(&documents, options)?;
        let page_count = merged.page_count();
        let bytes = self.writer.encode(merged)?;

        let statistics = MergeStatistics {
            files_merged: documents.len(),
            total_pages: page_count,
            input_size: sources.iter().map(|s| s.as_ref().len() as u64).sum(),
            output_size: bytes.len() as u64,
            bookmarks_added,
            merge_time: start.elapsed(),
        };

        info!(
            files = statistics.files_merged,
            pages = page_count,
            mode = ?options.mode,
            bookmarks = bookmarks_added,
            input = %statistics.format_input_size(),
            output = %statistics.format_output_size(),
            "merged documents"
        );

        Ok(MergeOutput {
            bytes,
            page_count,
            statistics,
        })
    }

    /// Merge decoded documents.
    ///
    /// Returns the merged document and the number of outline entries
    /// carried over.
    pub fn merge_documents(
        &self,
        documents: &[PdfDocument],
        options: &MergeOptions,
    ) -> Result<(PdfDocument, usize)> {
        let version = highest_version(documents.iter().map(PdfDocument::version));
        let mut merged = PdfDocument::with_version(version);

        let mut copies: Vec<Vec<PageHandle>> = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let indices: Vec<usize> = (0..document.page_count()).collect();
            let handles = merged.copy_pages(document, &indices)?;
            debug!(source = index, pages = handles.len(), "copied source pages");
            copies.push(handles);
        }

        let page_counts: Vec<usize> = copies.iter().map(Vec::len).collect();
        for (source, page) in page_order(&page_counts, options.mode) {
            merged.add_page(&copies[source][page])?;
        }

        let expected: usize = page_counts.iter().sum();
        if merged.page_count() != expected {
            return Err(PdfOpsError::internal(format!(
                "merged document has {} pages, expected {expected}",
                merged.page_count()
            )));
        }

        let bookmarks_added = if options.include_bookmarks {
            self.carry_bookmarks(&mut merged, documents, &copies)?
        } else {
            0
        };

        Ok((merged, bookmarks_added))
    }

    fn carry_bookmarks(
        &self,
        merged: &mut PdfDocument,
        documents: &[PdfDocument],
        copies: &[Vec<PageHandle>],
    ) -> Result<usize> {
        let mut bookmarks = Vec::new();

        for (document, handles) in documents.iter().zip(copies) {
            let source_pages = document.page_ids();
            let page_map: HashMap<ObjectId, ObjectId> = handles
                .iter()
                .map(|handle| (source_pages[handle.source_index()], handle.id()))
                .collect();
            bookmarks.extend(self.bookmarks.collect(document.inner(), &page_map));
        }

        self.bookmarks.install(merged.inner_mut(), &bookmarks)
    }
}

/// Order in which (source, page) pairs appear in the merged document.
///
/// `Concatenate` walks each source in turn; `Interleave` takes page 1 of
/// every source, then page 2, skipping sources that have run out.
pub fn page_order(page_counts: &[usize], mode: MergeMode) -> Vec<(usize, usize)> {
    match mode {
        MergeMode::Concatenate => page_counts
            .iter()
            .enumerate()
            .flat_map(|(source, &count)| (0..count).map(move |page| (source, page)))
            .collect(),
        MergeMode::Interleave => {
            let rounds = page_counts.iter().copied().max().unwrap_or(0);
            (0..rounds)
                .flat_map(|page| {
                    page_counts
                        .iter()
                        .enumerate()
                        .filter(move |&(_, &count)| page < count)
                        .map(move |(source, _)| (source, page))
                })
                .collect()
        }
    }
}

/// Pick the highest declared version, e.g. `"1.4"` and `"1.7"` give `"1.7"`.
fn highest_version<'a>(versions: impl Iterator<Item = &'a str>) -> &'a str {
    versions
        .max_by_key(|version| parse_version(version))
        .unwrap_or(crate::codec::document::DEFAULT_VERSION)
}

fn parse_version(version: &str) -> (u32, u32) {
    let (major, minor) = version.trim().split_once('.').unwrap_or((version, "0"));
    (
        major.parse().unwrap_or_default(),
        minor.parse().unwrap_or_default(),
    )
}
