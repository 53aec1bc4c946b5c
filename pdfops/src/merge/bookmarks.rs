//! Outline (bookmark) transplanting for merged documents.
//!
//! A source outline is read into a tree of [`Bookmark`]s whose destinations
//! already point at pages of the destination document. The trees of all
//! sources are then written under one outline root.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::Result;

/// Nesting limit for outlines and name trees in untrusted input.
const MAX_DEPTH: usize = 32;

/// One outline entry with a destination in the merged document.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    /// Raw title string as stored in the source (PDFDocEncoding or UTF-16BE).
    pub title: Vec<u8>,

    /// Explicit destination array whose first element is a destination page,
    /// or `None` if the source target could not be resolved.
    pub destination: Option<Vec<Object>>,

    /// Whether the entry is shown expanded.
    pub open: bool,

    /// Nested entries.
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    /// Create a bookmark pointing at a page with a `/Fit` view.
    pub fn to_page(title: &str, page: ObjectId) -> Self {
        Self {
            title: title.as_bytes().to_vec(),
            destination: Some(vec![Object::Reference(page), Object::Name(b"Fit".to_vec())]),
            open: true,
            children: Vec::new(),
        }
    }

    /// Title decoded for display.
    pub fn title_text(&self) -> String {
        decode_text_string(&self.title)
    }

    /// Destination page, if resolved.
    pub fn target_page(&self) -> Option<ObjectId> {
        self.destination
            .as_ref()
            .and_then(|dest| dest.first())
            .and_then(|page| page.as_reference().ok())
    }

    /// This entry plus all descendants.
    pub fn total_count(&self) -> usize {
        1 + self.children.iter().map(Bookmark::total_count).sum::<usize>()
    }

    /// Entries visible below this one when it is expanded.
    fn visible_descendants(&self) -> usize {
        self.children.iter().map(Bookmark::visible_count).sum()
    }

    fn visible_count(&self) -> usize {
        1 + if self.open {
            self.visible_descendants()
        } else {
            0
        }
    }
}

/// Reads and writes document outlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookmarkManager;

impl BookmarkManager {
    /// Create a new bookmark manager.
    pub fn new() -> Self {
        Self
    }

    /// Read the outline of `source`.
    ///
    /// `page_map` maps source page ids to destination page ids. Entries whose
    /// target is missing from the map, or cannot be resolved at all, are kept
    /// without a destination.
    pub fn collect(
        &self,
        source: &Document,
        page_map: &HashMap<ObjectId, ObjectId>,
    ) -> Vec<Bookmark> {
        let Some(root) = outline_root(source) else {
            return Vec::new();
        };

        let mut reader = OutlineReader {
            source,
            page_map,
            visited: HashSet::new(),
            unresolved: 0,
        };
        let bookmarks = reader.read_siblings(root, 0);

        if reader.unresolved > 0 {
            warn!(
                unresolved = reader.unresolved,
                "outline entries kept without destination"
            );
        }
        debug!(
            entries = bookmarks.iter().map(Bookmark::total_count).sum::<usize>(),
            "collected outline"
        );

        bookmarks
    }

    /// Write `bookmarks` as the outline of `doc`, replacing any existing one.
    ///
    /// Returns the number of entries written.
    pub fn install(&self, doc: &mut Document, bookmarks: &[Bookmark]) -> Result<usize> {
        if bookmarks.is_empty() {
            return Ok(0);
        }

        let outline_id = doc.new_object_id();
        let (first, last) = write_level(doc, bookmarks, outline_id);
        let visible: usize = bookmarks.iter().map(Bookmark::visible_count).sum();

        let mut outline = Dictionary::new();
        outline.set("Type", Object::Name(b"Outlines".to_vec()));
        outline.set("First", Object::Reference(first));
        outline.set("Last", Object::Reference(last));
        outline.set("Count", Object::Integer(visible as i64));
        doc.objects.insert(outline_id, Object::Dictionary(outline));

        doc.catalog_mut()?
            .set("Outlines", Object::Reference(outline_id));

        Ok(bookmarks.iter().map(Bookmark::total_count).sum())
    }

    /// Check if the document has an outline.
    pub fn has_bookmarks(&self, doc: &Document) -> bool {
        doc.catalog()
            .map(|catalog| catalog.has(b"Outlines"))
            .unwrap_or(false)
    }
}

/// Write one sibling level; returns (first, last) item ids.
fn write_level(doc: &mut Document, items: &[Bookmark], parent: ObjectId) -> (ObjectId, ObjectId) {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (i, (item, &id)) in items.iter().zip(&ids).enumerate() {
        let mut dict = Dictionary::new();
        dict.set(
            "Title",
            Object::String(item.title.clone(), StringFormat::Literal),
        );
        dict.set("Parent", Object::Reference(parent));

        if let Some(destination) = &item.destination {
            dict.set("Dest", Object::Array(destination.clone()));
        }
        if i > 0 {
            dict.set("Prev", Object::Reference(ids[i - 1]));
        }
        if let Some(&next) = ids.get(i + 1) {
            dict.set("Next", Object::Reference(next));
        }

        if !item.children.is_empty() {
            let (first, last) = write_level(doc, &item.children, id);
            let count = item.visible_descendants() as i64;
            dict.set("First", Object::Reference(first));
            dict.set("Last", Object::Reference(last));
            dict.set("Count", if item.open { count } else { -count });
        }

        doc.objects.insert(id, Object::Dictionary(dict));
    }

    // Callers never pass an empty level.
    (ids[0], ids[ids.len() - 1])
}

struct OutlineReader<'a> {
    source: &'a Document,
    page_map: &'a HashMap<ObjectId, ObjectId>,
    visited: HashSet<ObjectId>,
    unresolved: usize,
}

impl OutlineReader<'_> {
    /// Read the children of the outline node `parent`.
    fn read_siblings(&mut self, parent: &Dictionary, depth: usize) -> Vec<Bookmark> {
        let mut bookmarks = Vec::new();
        if depth >= MAX_DEPTH {
            return bookmarks;
        }

        let source = self.source;
        let mut next = parent.get(b"First").and_then(Object::as_reference).ok();
        while let Some(id) = next {
            if !self.visited.insert(id) {
                break;
            }
            let Ok(item) = source.get_dictionary(id) else {
                break;
            };

            let destination = self.resolve_item_target(item);
            if destination.is_none() {
                self.unresolved += 1;
            }

            bookmarks.push(Bookmark {
                title: item
                    .get(b"Title")
                    .and_then(Object::as_str)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default(),
                destination,
                open: item.get(b"Count").and_then(Object::as_i64).unwrap_or(0) >= 0,
                children: self.read_siblings(item, depth + 1),
            });

            next = item.get(b"Next").and_then(Object::as_reference).ok();
        }

        bookmarks
    }

    fn resolve_item_target(&self, item: &Dictionary) -> Option<Vec<Object>> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.resolve_destination(dest, 0);
        }

        let action = self.deref(item.get(b"A").ok()?)?.as_dict().ok()?;
        if action.get(b"S").and_then(Object::as_name).ok()? != b"GoTo" {
            return None;
        }
        self.resolve_destination(action.get(b"D").ok()?, 0)
    }

    fn resolve_destination(&self, dest: &Object, depth: usize) -> Option<Vec<Object>> {
        if depth >= MAX_DEPTH {
            return None;
        }

        match self.deref(dest)? {
            Object::Array(explicit) => self.remap_explicit(explicit),
            Object::Dictionary(dict) => self.resolve_destination(dict.get(b"D").ok()?, depth + 1),
            Object::Name(name) => {
                let target = self.lookup_named(name)?;
                self.resolve_destination(target, depth + 1)
            }
            Object::String(name, _) => {
                let target = self.lookup_named(name)?;
                self.resolve_destination(target, depth + 1)
            }
            _ => None,
        }
    }

    /// Rewrite `[page /View args...]` to point at the destination page.
    fn remap_explicit(&self, explicit: &[Object]) -> Option<Vec<Object>> {
        let (page, view) = explicit.split_first()?;
        let new_page = *self.page_map.get(&page.as_reference().ok()?)?;

        let mut remapped = Vec::with_capacity(explicit.len());
        remapped.push(Object::Reference(new_page));
        remapped.extend(view.iter().map(|arg| match self.deref(arg) {
            Some(Object::Name(name)) => Object::Name(name.clone()),
            Some(Object::Integer(value)) => Object::Integer(*value),
            Some(Object::Real(value)) => Object::Real(*value),
            _ => Object::Null,
        }));
        Some(remapped)
    }

    /// Look up a named destination in the catalog `Dests` dictionary or the
    /// `Names` tree.
    fn lookup_named(&self, name: &[u8]) -> Option<&Object> {
        let catalog = self.source.catalog().ok()?;

        if let Some(dests) = catalog
            .get(b"Dests")
            .ok()
            .and_then(|d| self.deref(d))
            .and_then(|d| d.as_dict().ok())
            && let Ok(target) = dests.get(name)
        {
            return Some(target);
        }

        let names = self.deref(catalog.get(b"Names").ok()?)?.as_dict().ok()?;
        let tree = self.deref(names.get(b"Dests").ok()?)?.as_dict().ok()?;
        self.lookup_name_tree(tree, name, 0)
    }

    fn lookup_name_tree<'a>(
        &'a self,
        node: &'a Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        if depth >= MAX_DEPTH {
            return None;
        }

        if let Some(pairs) = node
            .get(b"Names")
            .ok()
            .and_then(|n| self.deref(n))
            .and_then(|n| n.as_array().ok())
        {
            for pair in pairs.chunks(2) {
                if let [key, value] = pair
                    && self.deref(key).and_then(|k| k.as_str().ok()) == Some(name)
                {
                    return Some(value);
                }
            }
        }

        let kids = self.deref(node.get(b"Kids").ok()?)?.as_array().ok()?;
        kids.iter().find_map(|kid| {
            let kid = self.deref(kid)?.as_dict().ok()?;
            self.lookup_name_tree(kid, name, depth + 1)
        })
    }

    fn deref<'o>(&'o self, object: &'o Object) -> Option<&'o Object> {
        match object {
            Object::Reference(id) => self.source.get_object(*id).ok(),
            direct => Some(direct),
        }
    }
}

fn outline_root(source: &Document) -> Option<&Dictionary> {
    let outlines = source.catalog().ok()?.get(b"Outlines").ok()?;
    match outlines {
        Object::Reference(id) => source.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise byte-per-char).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}
