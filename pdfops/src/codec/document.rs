//! The in-memory document graph and page transplanting.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::copier::ObjectCopier;
use crate::error::{PdfOpsError, Result};

/// Default version for documents built from scratch.
pub const DEFAULT_VERSION: &str = "1.7";

static NEXT_DOCUMENT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
    NEXT_DOCUMENT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// A page copied into a destination document but not yet attached to its
/// page tree.
///
/// Handles are bound to the document that produced them; attaching a handle
/// to another document, or attaching it twice, fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    document: u64,
    id: ObjectId,
    source_index: usize,
}

impl PageHandle {
    /// Object id of the copied page in the destination document.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Zero-based index of the page in its source document.
    pub fn source_index(&self) -> usize {
        self.source_index
    }
}

/// A decoded PDF document.
///
/// Wraps a [`lopdf::Document`] and tracks which copied pages are still
/// waiting to be attached.
#[derive(Debug)]
pub struct PdfDocument {
    inner: Document,
    token: u64,
    pending: BTreeSet<ObjectId>,
}

impl PdfDocument {
    /// Create an empty document (catalog plus an empty page tree).
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION)
    }

    /// Create an empty document declaring `version`.
    pub fn with_version(version: &str) -> Self {
        let mut doc = Document::with_version(version);

        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Self::from_lopdf(doc)
    }

    /// Wrap an already-loaded lopdf document.
    pub fn from_lopdf(inner: Document) -> Self {
        Self {
            inner,
            token: next_token(),
            pending: BTreeSet::new(),
        }
    }

    /// Number of pages reachable from the page tree.
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Object ids of all pages, in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    /// Declared PDF version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Borrow the underlying lopdf document.
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Mutably borrow the underlying lopdf document.
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Unwrap into the underlying lopdf document.
    ///
    /// Copied pages that were never attached stay in the object table and
    /// are dropped by the writer's pruning pass.
    pub fn into_inner(self) -> Document {
        self.inner
    }

    /// Copy pages of `source` into this document.
    ///
    /// Every object the pages depend on is deep-copied once per call and
    /// shared between the pages of that call. Duplicate indices produce
    /// independent pages. The returned handles are in the order of
    /// `indices` and must be attached with [`PdfDocument::add_page`].
    ///
    /// # Errors
    ///
    /// Returns `PageIndexOutOfBounds` if any index is not a page of
    /// `source`; in that case nothing is copied.
    pub fn copy_pages(&mut self, source: &PdfDocument, indices: &[usize]) -> Result<Vec<PageHandle>> {
        let source_pages = source.page_ids();

        if let Some(&index) = indices.iter().find(|&&i| i >= source_pages.len()) {
            return Err(PdfOpsError::PageIndexOutOfBounds {
                index,
                page_count: source_pages.len(),
            });
        }

        let selected: Vec<ObjectId> = indices.iter().map(|&i| source_pages[i]).collect();
        let mut copier = ObjectCopier::new(&source.inner);
        let new_ids = copier.copy_pages(&mut self.inner, &selected)?;

        let handles = new_ids
            .into_iter()
            .zip(indices)
            .map(|(id, &source_index)| {
                self.pending.insert(id);
                PageHandle {
                    document: self.token,
                    id,
                    source_index,
                }
            })
            .collect();

        Ok(handles)
    }

    /// Append a copied page to the end of the page tree.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the handle belongs to another document or was
    /// already attached.
    pub fn add_page(&mut self, handle: &PageHandle) -> Result<()> {
        if handle.document != self.token {
            return Err(PdfOpsError::internal(
                "page handle belongs to a different document",
            ));
        }
        if !self.pending.remove(&handle.id) {
            return Err(PdfOpsError::internal(format!(
                "page {:?} is already attached",
                handle.id
            )));
        }

        let pages_id = self.pages_root()?;

        self.inner
            .get_dictionary_mut(handle.id)?
            .set("Parent", pages_id);

        let pages = self.inner.get_dictionary_mut(pages_id)?;
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);

        if !matches!(pages.get(b"Kids"), Ok(Object::Array(_))) {
            pages.set("Kids", Vec::<Object>::new());
        }
        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(handle.id));
        }
        pages.set("Count", count + 1);

        Ok(())
    }

    /// Attach several copied pages in order.
    pub fn add_pages(&mut self, handles: &[PageHandle]) -> Result<()> {
        handles.iter().try_for_each(|handle| self.add_page(handle))
    }

    /// Object id of the root page tree node.
    pub fn pages_root(&self) -> Result<ObjectId> {
        let pages = self.inner.catalog()?.get(b"Pages")?.as_reference()?;
        Ok(pages)
    }

    /// Mutably borrow the catalog dictionary.
    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        Ok(self.inner.catalog_mut()?)
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}
