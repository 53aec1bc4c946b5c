//! Document codec: byte buffers to document graphs and back.
//!
//! - [`PdfReader`] decodes buffers into [`PdfDocument`]s
//! - [`PdfDocument`] copies pages between documents and maintains the page tree
//! - [`PdfWriter`] encodes documents, optionally deduplicating shared objects

mod copier;
pub mod dedup;
pub mod document;
pub mod reader;
pub mod writer;

pub(crate) use copier::page_attribute;
pub use document::{PageHandle, PdfDocument};
pub use reader::PdfReader;
pub use writer::{EncodedDocument, PdfWriter, WriteOptions, WriteStatistics};

use lopdf::Stream;

use crate::error::Result;

/// Decode a buffer with the default reader.
pub fn decode(bytes: &[u8]) -> Result<PdfDocument> {
    PdfReader::new().decode(bytes, 0)
}

/// Encode a document with the default writer.
pub fn encode(document: PdfDocument) -> Result<Vec<u8>> {
    PdfWriter::new().encode(document)
}

/// Number of pages in a document.
pub fn page_count(document: &PdfDocument) -> usize {
    document.page_count()
}

/// Copy pages of `source` into `dest`; see [`PdfDocument::copy_pages`].
pub fn copy_pages(
    dest: &mut PdfDocument,
    source: &PdfDocument,
    indices: &[usize],
) -> Result<Vec<PageHandle>> {
    dest.copy_pages(source, indices)
}

/// Decoded stream bytes, or the raw bytes if the filter is unsupported.
pub(crate) fn stream_data(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    } else {
        stream.content.clone()
    }
}
