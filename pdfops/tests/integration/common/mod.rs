//! Fixture PDFs synthesised in memory.
//!
//! Every page shows a marker like `A3` (label plus 1-based page number) so
//! page order and content can be asserted after any transformation.

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Builder for multi-page fixture documents.
pub struct FixtureBuilder {
    label: String,
    pages: usize,
    version: String,
    outline: bool,
    font_per_page: bool,
}

impl FixtureBuilder {
    pub fn new(label: &str, pages: usize) -> Self {
        Self {
            label: label.to_string(),
            pages,
            version: "1.5".to_string(),
            outline: false,
            font_per_page: false,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add one top-level outline entry per page, titled `"{label} chapter {n}"`.
    pub fn with_outline(mut self) -> Self {
        self.outline = true;
        self
    }

    /// Give every page its own copy of an identical font dictionary.
    pub fn with_duplicated_fonts(mut self) -> Self {
        self.font_per_page = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version(self.version.as_str());
        let pages_id = doc.new_object_id();
        let shared_font = doc.add_object(font());

        let mut page_ids = Vec::with_capacity(self.pages);
        for n in 1..=self.pages {
            let font_id = if self.font_per_page {
                doc.add_object(font())
            } else {
                shared_font
            };
            let content = format!("BT /F1 24 Tf 72 720 Td ({}{n}) Tj ET", self.label);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => self.pages as i64,
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if self.outline && !page_ids.is_empty() {
            catalog.set("Outlines", add_outline(&mut doc, &self.label, &page_ids));
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        save(&mut doc)
    }
}

fn font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    }
}

fn add_outline(doc: &mut Document, label: &str, page_ids: &[ObjectId]) -> ObjectId {
    let root_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = page_ids.iter().map(|_| doc.new_object_id()).collect();

    for (i, (&item_id, &page_id)) in item_ids.iter().zip(page_ids).enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(format!("{label} chapter {}", i + 1)),
            "Parent" => root_id,
            "Dest" => vec![page_id.into(), "Fit".into()],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if i + 1 < item_ids.len() {
            item.set("Next", item_ids[i + 1]);
        }
        doc.objects.insert(item_id, Object::Dictionary(item));
    }

    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_ids[0],
            "Last" => item_ids[item_ids.len() - 1],
            "Count" => item_ids.len() as i64,
        }),
    );
    root_id
}

/// A `pages`-page document labelled `label`.
pub fn build_pdf(label: &str, pages: usize) -> Vec<u8> {
    FixtureBuilder::new(label, pages).build()
}

/// A one-page document drawing an unfiltered `width` x `height` RGB image.
pub fn image_pdf(width: u32, height: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 128]);
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        samples,
    ));
    let content = format!("q {width} 0 0 {height} 0 0 cm /Im1 Do Q BT /F1 12 Tf (IMG1) Tj ET");
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(&mut doc)
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture encodes");
    bytes
}

/// Page markers of an encoded document, in page order.
pub fn markers(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("result decodes");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).expect("page has content");
            let text = String::from_utf8_lossy(&content);
            let start = text.rfind('(').expect("marker start") + 1;
            let end = text.rfind(')').expect("marker end");
            text[start..end].to_string()
        })
        .collect()
}

/// Expected markers for `label` pages `1..=pages`.
pub fn expected_markers(label: &str, pages: usize) -> Vec<String> {
    (1..=pages).map(|n| format!("{label}{n}")).collect()
}

/// Outline titles of an encoded document, depth first.
pub fn outline_titles(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("result decodes");
    let Ok(root) = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
    else {
        return Vec::new();
    };

    let mut titles = Vec::new();
    let mut next = doc
        .get_dictionary(root)
        .and_then(|outlines| outlines.get(b"First"))
        .and_then(Object::as_reference)
        .ok();
    while let Some(id) = next {
        let item = doc.get_dictionary(id).expect("outline item");
        let title = item.get(b"Title").and_then(Object::as_str).expect("title");
        titles.push(String::from_utf8_lossy(title).into_owned());
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    titles
}

/// Version declared by an encoded document.
pub fn version_of(bytes: &[u8]) -> String {
    Document::load_mem(bytes).expect("result decodes").version
}
