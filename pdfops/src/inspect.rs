//! Document inspection.
//!
//! Reports what a buffer contains without transforming it. Used by uploads
//! to record page counts and by the `info` command.

use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};

use crate::codec::{PdfDocument, PdfReader, page_attribute};
use crate::error::Result;

/// Summary of a decoded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Number of pages.
    pub page_count: usize,

    /// Declared PDF version, e.g. `"1.7"`.
    pub version: String,

    /// Number of indirect objects.
    pub object_count: usize,

    /// First page dimensions (width, height) in points, if available.
    pub page_dimensions: Option<(f32, f32)>,

    /// Size of the buffer in bytes.
    pub byte_size: u64,

    /// Whether the document carries an outline.
    pub has_outline: bool,
}

impl DocumentInfo {
    /// Summarize an already decoded document.
    pub fn from_document(document: &PdfDocument, byte_size: u64) -> Self {
        let doc = document.inner();
        let page_dimensions = document
            .page_ids()
            .first()
            .and_then(|&id| media_box_size(doc, id));

        let has_outline = doc
            .catalog()
            .map(|catalog| catalog.has(b"Outlines"))
            .unwrap_or(false);

        Self {
            page_count: document.page_count(),
            version: document.version().to_string(),
            object_count: doc.objects.len(),
            page_dimensions,
            byte_size,
            has_outline,
        }
    }
}

/// Decode `bytes` and summarize them.
///
/// # Errors
///
/// Returns `MalformedDocument` if the buffer does not decode.
pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo> {
    let document = PdfReader::new().decode(bytes, 0)?;
    Ok(DocumentInfo::from_document(&document, bytes.len() as u64))
}

/// The page's `MediaBox`, inherited from the page tree if the page has none.
fn media_box_size(doc: &Document, page_id: lopdf::ObjectId) -> Option<(f32, f32)> {
    let media_box = match page_attribute(doc, page_id, b"MediaBox")? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        direct => direct,
    };
    let values = media_box.as_array().ok()?;
    if values.len() < 4 {
        return None;
    }

    let number = |object: &Object| -> Option<f32> {
        match object {
            Object::Integer(value) => Some(*value as f32),
            Object::Real(value) => Some(*value as f32),
            _ => None,
        }
    };

    let width = number(&values[2])? - number(&values[0])?;
    let height = number(&values[3])? - number(&values[1])?;
    Some((width.abs(), height.abs()))
}
