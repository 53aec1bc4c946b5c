//! Structural deduplication of indirect objects.
//!
//! Two indirect objects are duplicates when their canonical encodings are
//! identical: dictionary keys sorted, stream `Length` ignored, references
//! compared by id. Duplicates are collapsed onto the lowest id and every
//! reference is rewritten. Rewriting can make further objects identical
//! (two fonts that pointed at two identical descriptors), so passes repeat
//! until nothing changes.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Upper bound on rewrite passes; each pass shortens reference chains by at
/// least one level, so real documents settle in a handful.
const MAX_PASSES: usize = 32;

/// Collapse structurally identical objects. Returns how many were removed.
pub fn deduplicate(doc: &mut Document) -> usize {
    let mut removed = 0;

    for pass in 1..=MAX_PASSES {
        let replacements = find_duplicates(doc);
        if replacements.is_empty() {
            break;
        }

        for id in replacements.keys() {
            doc.objects.remove(id);
        }
        for object in doc.objects.values_mut() {
            rewrite_references(object, &replacements);
        }
        for (_, value) in doc.trailer.iter_mut() {
            rewrite_references(value, &replacements);
        }

        debug!(pass, collapsed = replacements.len(), "deduplication pass");
        removed += replacements.len();
    }

    removed
}

/// Map every duplicate id to the lowest id with the same fingerprint.
fn find_duplicates(doc: &Document) -> BTreeMap<ObjectId, ObjectId> {
    let mut representatives: HashMap<Vec<u8>, ObjectId> = HashMap::new();
    let mut replacements = BTreeMap::new();

    // BTreeMap iteration is ascending, so the first id seen is the lowest.
    for (&id, object) in &doc.objects {
        if !is_shareable(object) {
            continue;
        }

        let mut fingerprint = Vec::new();
        write_canonical(object, &mut fingerprint);

        match representatives.get(&fingerprint) {
            Some(&keep) => {
                replacements.insert(id, keep);
            }
            None => {
                representatives.insert(fingerprint, id);
            }
        }
    }

    replacements
}

/// Objects whose identity matters are never merged.
fn is_shareable(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return true,
    };

    let structural_type = matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page" | b"Pages" | b"Catalog" | b"Annot" | b"Outlines")
    );

    let annotation = dict.has(b"Subtype") && dict.has(b"Rect");

    !(structural_type || annotation || is_outline_item(dict))
}

fn is_outline_item(dict: &Dictionary) -> bool {
    dict.has(b"Title") && (dict.has(b"Parent") || dict.has(b"Next") || dict.has(b"Prev"))
}

fn rewrite_references(object: &mut Object, replacements: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(&keep) = replacements.get(id) {
                *id = keep;
            }
        }
        Object::Array(items) => {
            for item in items {
                rewrite_references(item, replacements);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                rewrite_references(value, replacements);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                rewrite_references(value, replacements);
            }
        }
        _ => {}
    }
}

/// Append a canonical, unambiguous encoding of `object` to `out`.
fn write_canonical(object: &Object, out: &mut Vec<u8>) {
    match object {
        Object::Null => out.push(b'n'),
        Object::Boolean(value) => {
            out.push(b'b');
            out.push(u8::from(*value));
        }
        Object::Integer(value) => {
            out.push(b'i');
            out.extend_from_slice(&value.to_le_bytes());
        }
        Object::Real(value) => {
            out.push(b'r');
            out.extend_from_slice(&value.to_bits().to_le_bytes());
        }
        Object::Name(name) => {
            out.push(b'/');
            write_bytes(name, out);
        }
        Object::String(bytes, _) => {
            out.push(b's');
            write_bytes(bytes, out);
        }
        Object::Array(items) => {
            out.push(b'[');
            out.extend_from_slice(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_canonical(item, out);
            }
        }
        Object::Dictionary(dict) => write_dictionary(dict, None, out),
        Object::Stream(stream) => {
            out.push(b'S');
            write_dictionary(&stream.dict, Some(b"Length"), out);
            write_bytes(&stream.content, out);
        }
        Object::Reference((number, generation)) => {
            out.push(b'R');
            out.extend_from_slice(&number.to_le_bytes());
            out.extend_from_slice(&generation.to_le_bytes());
        }
    }
}

fn write_dictionary(dict: &Dictionary, skip: Option<&[u8]>, out: &mut Vec<u8>) {
    let mut entries: Vec<(&Vec<u8>, &Object)> = dict
        .iter()
        .filter(|(key, _)| Some(key.as_slice()) != skip)
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push(b'<');
    out.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for (key, value) in entries {
        write_bytes(key, out);
        write_canonical(value, out);
    }
}

/// Length-prefixed so adjacent byte strings cannot run together.
fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}
