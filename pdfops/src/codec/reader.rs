//! Decoding PDF byte buffers.
//!
//! The reader turns a source buffer into a [`PdfDocument`]. Decoding is
//! strict about the things the engines rely on (a `%PDF-` header, a document
//! catalog, no encryption) and lenient about everything else, so documents
//! from any compliant encoder are accepted.
//!
//! # Examples
//!
//! ```no_run
//! use pdfops::codec::PdfReader;
//!
//! # fn example(bytes: &[u8]) -> pdfops::Result<()> {
//! let reader = PdfReader::new();
//! let document = reader.decode(bytes, 0)?;
//! println!("{} pages", document.page_count());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::document::PdfDocument;
use crate::error::{PdfOpsError, Result};

/// Magic bytes every PDF file starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into the buffer the header may appear.
///
/// Some producers prepend junk before the header; readers conventionally
/// scan the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader {
    /// Reject documents without any page.
    require_pages: bool,
}

impl PdfReader {
    /// Create a reader that accepts zero-page documents.
    pub fn new() -> Self {
        Self {
            require_pages: false,
        }
    }

    /// Create a reader that rejects zero-page documents as malformed.
    pub fn requiring_pages() -> Self {
        Self {
            require_pages: true,
        }
    }

    /// Decode `bytes` into a document.
    ///
    /// `index` is the position of the buffer among the operation's inputs and
    /// is carried in the error so callers can say which input was bad.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if:
    /// - The buffer has no `%PDF-` header
    /// - The cross-reference structure or object syntax is corrupt
    /// - The document has no catalog
    /// - The document is encrypted
    /// - The reader requires pages and the document has none
    pub fn decode(&self, bytes: &[u8], index: usize) -> Result<PdfDocument> {
        let start = Instant::now();

        if !has_pdf_header(bytes) {
            return Err(PdfOpsError::malformed(
                index,
                "missing %PDF- header (not a PDF document)",
            ));
        }

        let document = Document::load_mem(bytes)
            .map_err(|e| PdfOpsError::malformed(index, e.to_string()))?;

        if document.is_encrypted() {
            return Err(PdfOpsError::malformed(
                index,
                "encrypted documents are not supported",
            ));
        }

        document
            .catalog()
            .map_err(|e| PdfOpsError::malformed(index, format!("no document catalog: {e}")))?;

        let document = PdfDocument::from_lopdf(document);

        if self.require_pages && document.page_count() == 0 {
            return Err(PdfOpsError::malformed(index, "document has no pages"));
        }

        debug!(
            index,
            bytes = bytes.len(),
            pages = document.page_count(),
            version = %document.version(),
            elapsed = ?start.elapsed(),
            "decoded document"
        );

        Ok(document)
    }

    /// Decode several buffers, failing on the first malformed one.
    ///
    /// Every buffer is decoded before any result is returned, so callers can
    /// validate all inputs before producing output.
    pub fn decode_all<B: AsRef<[u8]>>(&self, sources: &[B]) -> Result<Vec<PdfDocument>> {
        sources
            .iter()
            .enumerate()
            .map(|(index, bytes)| self.decode(bytes.as_ref(), index))
            .collect()
    }

    /// Read a file into memory.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read.
    pub async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "read file");
        Ok(bytes)
    }
}

/// Check whether `bytes` carries a PDF header near its start.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}
