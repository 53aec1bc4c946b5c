//! Error handling and all-or-nothing behaviour.

use pdfops::codec::{PdfReader, PdfWriter};
use pdfops::config::{MergeOptions, SplitOptions};
use pdfops::error::PdfOpsError;
use pdfops::merge::Merger;
use pdfops::split::Splitter;
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{build_pdf, markers};

#[rstest]
#[case(0)]
#[case(1)]
fn test_merge_needs_two_sources(#[case] provided: usize) {
    let sources: Vec<Vec<u8>> = (0..provided).map(|_| build_pdf("A", 1)).collect();
    let err = Merger::new().merge(&sources, &MergeOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        PdfOpsError::InsufficientInputs { required: 2, provided: p } if p == provided
    ));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_merge_fails_whole_when_one_source_is_malformed() {
    let sources = vec![build_pdf("A", 2), b"%PDF-1.7\ngarbage".to_vec(), build_pdf("C", 2)];
    let err = Merger::new().merge(&sources, &MergeOptions::default()).unwrap_err();

    assert!(matches!(err, PdfOpsError::MalformedDocument { index: 1, .. }));
    assert!(err.is_caller_error());
}

#[rstest]
#[case::empty(b"".to_vec())]
#[case::text(b"hello world".to_vec())]
#[case::png_header(b"\x89PNG\r\n\x1a\n".to_vec())]
fn test_non_pdf_input_is_malformed(#[case] bytes: Vec<u8>) {
    let err = PdfReader::new().decode(&bytes, 4).unwrap_err();
    assert!(matches!(err, PdfOpsError::MalformedDocument { index: 4, .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_truncated_pdf_is_malformed() {
    let bytes = build_pdf("A", 3);
    let truncated = &bytes[..bytes.len() / 3];

    let err = Splitter::new().split(truncated, &SplitOptions::Single).unwrap_err();
    assert!(matches!(err, PdfOpsError::MalformedDocument { .. }));
}

#[test]
fn test_source_buffers_are_not_modified() {
    let a = build_pdf("A", 2);
    let b = build_pdf("B", 2);
    let (a_before, b_before) = (a.clone(), b.clone());

    Merger::new().merge(&[a.as_slice(), b.as_slice()], &MergeOptions::default()).unwrap();

    assert_eq!(a, a_before);
    assert_eq!(b, b_before);
}

#[tokio::test]
async fn test_save_writes_atomically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.pdf");
    let writer = PdfWriter::new();

    let stats = writer.save(build_pdf("A", 2), &path).await.unwrap();
    assert!(writer.exists(&path).await);
    assert_eq!(stats.file_size, std::fs::metadata(&path).unwrap().len());

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);

    let bytes = PdfReader::new().read_file(&path).await.unwrap();
    assert_eq!(markers(&bytes), vec!["A1", "A2"]);
}

#[tokio::test]
async fn test_read_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = PdfReader::new()
        .read_file(&dir.path().join("missing.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, PdfOpsError::Io { .. }));
    assert_eq!(err.status_code(), 500);
}
