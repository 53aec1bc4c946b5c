//! Compression: lossless deduplication and lossy image resampling.

use lopdf::{Document, Object};
use pdfops::codec::{PdfReader, PdfWriter, WriteOptions};
use pdfops::compress::Compressor;
use pdfops::config::{CompressOptions, Quality};

use crate::common::{FixtureBuilder, build_pdf, expected_markers, image_pdf, markers};

fn at_quality(quality: u8) -> CompressOptions {
    CompressOptions {
        quality: Quality::new(quality).unwrap(),
    }
}

fn image_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.objects
        .values()
        .filter_map(|object| object.as_stream().ok())
        .filter(|stream| {
            matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
        })
        .map(|stream| stream.dict.get(b"Width").and_then(Object::as_i64).unwrap())
        .collect()
}

#[test]
fn test_compress_preserves_pages() {
    let source = build_pdf("A", 6);
    let output = Compressor::new().compress(&source, &CompressOptions::default()).unwrap();

    assert_eq!(output.report.page_count, 6);
    assert_eq!(markers(&output.bytes), expected_markers("A", 6));
}

#[test]
fn test_compressing_twice_is_safe() {
    let compressor = Compressor::new();
    let once = compressor.compress(&build_pdf("A", 3), &CompressOptions::default()).unwrap();
    let twice = compressor.compress(&once.bytes, &CompressOptions::default()).unwrap();

    assert_eq!(twice.report.page_count, 3);
    assert_eq!(markers(&twice.bytes), expected_markers("A", 3));
}

#[test]
fn test_duplicated_fonts_are_collapsed() {
    let source = FixtureBuilder::new("A", 8).with_duplicated_fonts().build();

    let output = Compressor::new().compress(&source, &CompressOptions::default()).unwrap();
    assert!(output.report.objects_deduplicated >= 7);

    let plain = PdfWriter::with_options(WriteOptions {
        deduplicate: false,
        ..WriteOptions::default()
    })
    .encode(PdfReader::new().decode(&source, 0).unwrap())
    .unwrap();
    assert!(output.bytes.len() < plain.len());
}

#[test]
fn test_low_quality_resamples_images() {
    let source = image_pdf(280, 140);
    let output = Compressor::new().compress(&source, &at_quality(35)).unwrap();

    assert_eq!(output.report.images_resampled, 1);
    assert_eq!(image_widths(&output.bytes), vec![140]);
    assert!(output.report.compressed_size < output.report.original_size);
    assert!(output.report.percent() > 0.0);
    assert_eq!(markers(&output.bytes), vec!["IMG1"]);
}

#[test]
fn test_high_quality_leaves_images_alone() {
    let source = image_pdf(280, 140);
    let output = Compressor::new().compress(&source, &at_quality(90)).unwrap();

    assert_eq!(output.report.images_resampled, 0);
    assert_eq!(image_widths(&output.bytes), vec![280]);
}

#[test]
fn test_summary_matches_report() {
    let output = Compressor::new()
        .compress(&build_pdf("A", 2), &CompressOptions::default())
        .unwrap();
    let summary = output.report.summary();

    assert!(summary.starts_with("Reduced from "));
    assert!(summary.ends_with(&format!("({}% reduction)", output.report.rounded_percent())));
}
