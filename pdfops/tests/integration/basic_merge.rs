//! Merging documents end to end.

use pdfops::config::{MergeMode, MergeOptions, RawMergeOptions};
use pdfops::merge::Merger;
use proptest::prelude::*;

use crate::common::{FixtureBuilder, build_pdf, expected_markers, markers, outline_titles, version_of};

fn interleaved() -> MergeOptions {
    MergeOptions {
        mode: MergeMode::Interleave,
        include_bookmarks: false,
    }
}

#[test]
fn test_concatenate_keeps_source_order() {
    let sources = [build_pdf("A", 2), build_pdf("B", 3)];
    let output = Merger::new().merge(&sources, &MergeOptions::default()).unwrap();

    assert_eq!(output.page_count, 5);
    assert_eq!(markers(&output.bytes), vec!["A1", "A2", "B1", "B2", "B3"]);
    assert_eq!(output.statistics.files_merged, 2);
    assert_eq!(output.statistics.output_size, output.bytes.len() as u64);
}

#[test]
fn test_same_source_twice_yields_independent_pages() {
    let source = build_pdf("A", 2);
    let output = Merger::new()
        .merge(&[source.clone(), source], &MergeOptions::default())
        .unwrap();

    assert_eq!(markers(&output.bytes), vec!["A1", "A2", "A1", "A2"]);
}

#[test]
fn test_interleave_with_uneven_sources() {
    let sources = [build_pdf("A", 3), build_pdf("B", 1), build_pdf("C", 2)];
    let output = Merger::new().merge(&sources, &interleaved()).unwrap();

    assert_eq!(markers(&output.bytes), vec!["A1", "B1", "C1", "A2", "C2", "A3"]);
}

#[test]
fn test_result_uses_highest_version() {
    let sources = [
        FixtureBuilder::new("A", 1).version("1.4").build(),
        FixtureBuilder::new("B", 1).version("1.7").build(),
    ];
    let output = Merger::new().merge(&sources, &MergeOptions::default()).unwrap();

    assert_eq!(version_of(&output.bytes), "1.7");
}

#[test]
fn test_bookmarks_are_carried_when_requested() {
    let sources = [
        FixtureBuilder::new("A", 2).with_outline().build(),
        FixtureBuilder::new("B", 1).with_outline().build(),
    ];
    let options = MergeOptions {
        mode: MergeMode::Concatenate,
        include_bookmarks: true,
    };

    let output = Merger::new().merge(&sources, &options).unwrap();

    assert_eq!(output.statistics.bookmarks_added, 3);
    assert_eq!(
        outline_titles(&output.bytes),
        vec!["A chapter 1", "A chapter 2", "B chapter 1"]
    );
}

#[test]
fn test_bookmarks_are_dropped_by_default() {
    let sources = [
        FixtureBuilder::new("A", 2).with_outline().build(),
        build_pdf("B", 1),
    ];
    let output = Merger::new().merge(&sources, &MergeOptions::default()).unwrap();

    assert!(outline_titles(&output.bytes).is_empty());
    assert_eq!(output.statistics.bookmarks_added, 0);
}

#[test]
fn test_wire_options_select_interleave() {
    let raw: RawMergeOptions =
        serde_json::from_str(r#"{"mergeMode":"interleave","orientation":"portrait"}"#).unwrap();
    let options = MergeOptions::try_from(&raw).unwrap();

    let output = Merger::new()
        .merge(&[build_pdf("A", 2), build_pdf("B", 2)], &options)
        .unwrap();
    assert_eq!(markers(&output.bytes), vec!["A1", "B1", "A2", "B2"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_page_count_is_sum(counts in proptest::collection::vec(1usize..5, 2..5)) {
        let labels = ["A", "B", "C", "D"];
        let sources: Vec<Vec<u8>> = counts
            .iter()
            .zip(labels)
            .map(|(&pages, label)| build_pdf(label, pages))
            .collect();

        let output = Merger::new().merge(&sources, &MergeOptions::default()).unwrap();
        prop_assert_eq!(output.page_count, counts.iter().sum::<usize>());

        let expected: Vec<String> = counts
            .iter()
            .zip(labels)
            .flat_map(|(&pages, label)| expected_markers(label, pages))
            .collect();
        prop_assert_eq!(markers(&output.bytes), expected);
    }
}
