//! Deep copying of pages between documents.
//!
//! lopdf object ids are only meaningful inside one document, so a page can't
//! simply be moved: everything it references has to be copied along and
//! renumbered into the destination's id space.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

use crate::error::Result;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in broken page trees.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when neither the page nor its ancestors declare a size.
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Copies pages and their dependency closure out of one source document.
///
/// One copier is used per copy call: objects shared by several copied pages
/// (fonts, images, shared resource dictionaries) are copied once.
pub(crate) struct ObjectCopier<'a> {
    source: &'a Document,
    /// Source id -> destination id for every copied non-page object.
    copied: HashMap<ObjectId, ObjectId>,
    /// Source page id -> destination id of its first copy.
    page_map: HashMap<ObjectId, ObjectId>,
    /// Annotations of the page occurrence currently being copied.
    annotation_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
            page_map: HashMap::new(),
            annotation_map: HashMap::new(),
        }
    }

    /// Copy `pages` (source page ids, duplicates allowed) into `dest`.
    ///
    /// Returns the destination ids in input order. The copied pages have no
    /// `Parent` yet.
    pub(crate) fn copy_pages(
        &mut self,
        dest: &mut Document,
        pages: &[ObjectId],
    ) -> Result<Vec<ObjectId>> {
        let new_ids: Vec<ObjectId> = pages.iter().map(|_| dest.new_object_id()).collect();

        // Links between pages of the same call resolve to the first copy.
        for (&source_id, &new_id) in pages.iter().zip(&new_ids) {
            self.page_map.entry(source_id).or_insert(new_id);
        }

        for (&source_id, &new_id) in pages.iter().zip(&new_ids) {
            let page = self.copy_page(dest, source_id, new_id)?;
            dest.objects.insert(new_id, Object::Dictionary(page));
        }

        Ok(new_ids)
    }

    fn copy_page(
        &mut self,
        dest: &mut Document,
        source_id: ObjectId,
        new_id: ObjectId,
    ) -> Result<Dictionary> {
        let source = self.source;
        let original = source.get_dictionary(source_id)?;

        let mut page = Dictionary::new();
        for (key, value) in original.iter() {
            match key.as_slice() {
                // Parent is rewired on attach; article beads and annotations
                // are handled separately.
                b"Parent" | b"B" | b"Annots" => {}
                _ => page.set(key.clone(), self.copy_value(dest, value)),
            }
        }

        for key in INHERITABLE {
            if !page.has(key)
                && let Some(value) = inherited_attribute(source, source_id, key)
            {
                page.set(key, self.copy_value(dest, value));
            }
        }

        if !page.has(b"MediaBox") {
            page.set(
                "MediaBox",
                DEFAULT_MEDIA_BOX
                    .iter()
                    .map(|&v| Object::Integer(v))
                    .collect::<Vec<_>>(),
            );
        }

        if let Some(annotations) = self.copy_annotations(dest, original, new_id)
            && !annotations.is_empty()
        {
            page.set("Annots", annotations);
        }

        Ok(page)
    }

    /// Copy a page's annotations for one page occurrence.
    ///
    /// Each occurrence gets its own annotation objects whose `/P` points at
    /// the new page. References between annotations of the same page (popups,
    /// replies) stay inside the occurrence.
    fn copy_annotations(
        &mut self,
        dest: &mut Document,
        page: &'a Dictionary,
        new_page: ObjectId,
    ) -> Option<Vec<Object>> {
        let source = self.source;
        let entries = match page.get(b"Annots").ok()? {
            Object::Reference(id) => source.get_object(*id).ok()?.as_array().ok()?,
            Object::Array(entries) => entries,
            _ => return None,
        };

        self.annotation_map.clear();
        for entry in entries {
            if let Object::Reference(id) = entry {
                let new_id = dest.new_object_id();
                self.annotation_map.insert(*id, new_id);
            }
        }

        let mut copied = Vec::with_capacity(entries.len());
        for entry in entries {
            let (new_id, dict) = match entry {
                Object::Reference(id) => {
                    let Some(&new_id) = self.annotation_map.get(id) else {
                        continue;
                    };
                    match source.get_dictionary(*id) {
                        Ok(dict) => (new_id, dict),
                        Err(_) => continue,
                    }
                }
                Object::Dictionary(dict) => (dest.new_object_id(), dict),
                _ => continue,
            };

            let mut annotation = self.copy_dictionary(dest, dict);
            if annotation.has(b"P") {
                annotation.set("P", new_page);
            }
            dest.objects.insert(new_id, Object::Dictionary(annotation));
            copied.push(Object::Reference(new_id));
        }
        self.annotation_map.clear();

        Some(copied)
    }

    /// Copy a direct value, following and remapping references.
    fn copy_value(&mut self, dest: &mut Document, value: &'a Object) -> Object {
        match value {
            Object::Reference(id) => self.copy_reference(dest, *id),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_value(dest, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dest, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(dest, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dest: &mut Document, dict: &'a Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_value(dest, value));
        }
        copy
    }

    fn copy_reference(&mut self, dest: &mut Document, id: ObjectId) -> Object {
        if let Some(&new_id) = self
            .annotation_map
            .get(&id)
            .or_else(|| self.page_map.get(&id))
            .or_else(|| self.copied.get(&id))
        {
            return Object::Reference(new_id);
        }

        let source = self.source;
        let Ok(object) = source.get_object(id) else {
            // Dangling references are legal PDF and mean null.
            return Object::Null;
        };

        if is_structural(object) {
            return Object::Null;
        }

        let new_id = dest.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_value(dest, object);
        dest.objects.insert(new_id, copy);

        Object::Reference(new_id)
    }
}

/// Page tree nodes and the catalog belong to the source document and are
/// never copied along with a page.
fn is_structural(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page" | b"Pages" | b"Catalog")
    )
}

/// A page attribute from the page itself or, failing that, its ancestors.
pub(crate) fn page_attribute<'a>(
    source: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let page = source.get_dictionary(page_id).ok()?;
    match page.get(key) {
        Ok(value) => Some(value),
        Err(_) => inherited_attribute(source, page_id, key),
    }
}

/// Look up an inheritable attribute on the ancestors of `page_id`.
fn inherited_attribute<'a>(
    source: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = source.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = source.get_dictionary(parent).ok()?;
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
    }
    None
}
