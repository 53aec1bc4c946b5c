//! Splitting documents with each partition strategy.

use pdfops::config::{MergeOptions, RawSplitOptions, SplitOptions};
use pdfops::error::PdfOpsError;
use pdfops::merge::Merger;
use pdfops::split::Splitter;
use rstest::rstest;

use crate::common::{build_pdf, expected_markers, markers};

#[test]
fn test_single_yields_one_document_per_page() {
    let parts = Splitter::new()
        .split(&build_pdf("A", 4), &SplitOptions::Single)
        .unwrap();

    assert_eq!(parts.len(), 4);
    for (i, part) in parts.iter().enumerate() {
        assert_eq!(markers(&part.bytes), vec![format!("A{}", i + 1)]);
        assert_eq!(part.pages, vec![i as u32 + 1]);
    }
}

#[test]
fn test_single_roundtrip_through_merge() {
    let source = build_pdf("A", 5);
    let parts = Splitter::new().split(&source, &SplitOptions::Single).unwrap();
    let buffers: Vec<Vec<u8>> = parts.into_iter().map(|part| part.bytes).collect();

    let merged = Merger::new().merge(&buffers, &MergeOptions::default()).unwrap();

    assert_eq!(merged.page_count, 5);
    assert_eq!(markers(&merged.bytes), expected_markers("A", 5));
}

#[test]
fn test_range_three_to_eight() {
    let options = SplitOptions::ranges(["3-8"]).unwrap();
    let parts = Splitter::new().split(&build_pdf("A", 10), &options).unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].page_count, 6);
    assert_eq!(parts[0].suffix, "pages-3-8");
    assert_eq!(markers(&parts[0].bytes), vec!["A3", "A4", "A5", "A6", "A7", "A8"]);
}

#[test]
fn test_range_past_last_page() {
    let options = SplitOptions::ranges(["11"]).unwrap();
    let err = Splitter::new().split(&build_pdf("A", 10), &options).unwrap_err();

    match err {
        PdfOpsError::InvalidRange { expression, page_count } => {
            assert_eq!(expression, "11");
            assert_eq!(page_count, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case("0")]
#[case("0-4")]
fn test_page_zero_is_out_of_bounds(#[case] expression: &str) {
    let options = SplitOptions::ranges([expression]).unwrap();
    let err = Splitter::new().split(&build_pdf("A", 10), &options).unwrap_err();

    assert!(matches!(
        err,
        PdfOpsError::InvalidRange { expression: e, page_count: 10 } if e == expression
    ));
}

#[test]
fn test_reversed_range_is_a_syntax_error() {
    let err = SplitOptions::ranges(["5-3"]).unwrap_err();
    assert!(matches!(err, PdfOpsError::InvalidRangeSyntax { expression, .. } if expression == "5-3"));
}

#[test]
fn test_every_three_of_ten() {
    let parts = Splitter::new()
        .split(&build_pdf("A", 10), &SplitOptions::every(3).unwrap())
        .unwrap();

    let counts: Vec<usize> = parts.iter().map(|part| part.page_count).collect();
    assert_eq!(counts, vec![3, 3, 3, 1]);

    let suffixes: Vec<&str> = parts.iter().map(|part| part.suffix.as_str()).collect();
    assert_eq!(suffixes, vec!["part-1", "part-2", "part-3", "part-4"]);
    assert_eq!(markers(&parts[1].bytes), vec!["A4", "A5", "A6"]);
}

#[rstest]
#[case(r#"{}"#, 3)]
#[case(r#"{"splitMode":"single"}"#, 3)]
#[case(r#"{"splitMode":"every","every":2}"#, 2)]
#[case(r#"{"splitMode":"ranges","ranges":["1","2-3"]}"#, 2)]
#[case(r#"{"splitMode":"halves"}"#, 3)]
fn test_wire_options(#[case] json: &str, #[case] expected_parts: usize) {
    let raw: RawSplitOptions = serde_json::from_str(json).unwrap();
    let options = SplitOptions::try_from(&raw).unwrap();

    let parts = Splitter::new().split(&build_pdf("A", 3), &options).unwrap();
    assert_eq!(parts.len(), expected_parts);
}

#[rstest]
#[case(r#"{"splitMode":"ranges"}"#)]
#[case(r#"{"splitMode":"ranges","ranges":[]}"#)]
#[case(r#"{"splitMode":"every"}"#)]
#[case(r#"{"splitMode":"every","every":0}"#)]
fn test_wire_options_rejected(#[case] json: &str) {
    let raw: RawSplitOptions = serde_json::from_str(json).unwrap();
    assert!(matches!(
        SplitOptions::try_from(&raw),
        Err(PdfOpsError::InvalidOptions { .. })
    ));
}
