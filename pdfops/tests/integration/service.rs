//! The request-level service over an in-memory store.

use pdfops::error::PdfOpsError;
use pdfops::service::{CompressRequest, MergeRequest, PdfService, SplitRequest, Upload};
use pdfops::store::{FileStore, MemoryStore, OperationKind, OperationStatus, OperationStore};
use serde_json::json;

use crate::common::{build_pdf, image_pdf, markers};

fn upload(service: &PdfService<MemoryStore>, name: &str, bytes: Vec<u8>) -> u64 {
    let response = service
        .upload(vec![Upload {
            file_name: name.to_string(),
            bytes,
        }])
        .unwrap();
    response.files[0].id
}

#[test]
fn test_full_workflow() {
    let service = PdfService::new(MemoryStore::new());
    let a = upload(&service, "intro.pdf", build_pdf("A", 2));
    let b = upload(&service, "body.pdf", build_pdf("B", 4));

    let merged = service
        .merge(&serde_json::from_value(json!({ "fileIds": [a, b] })).unwrap())
        .unwrap();
    assert_eq!(merged.file.page_count, 6);

    let split = service
        .split(&SplitRequest {
            file_id: merged.file.id,
            options: serde_json::from_value(json!({ "splitMode": "every", "every": 4 })).unwrap(),
        })
        .unwrap();
    let names: Vec<&str> = split.files.iter().map(|f| f.file_name.as_str()).collect();
    let stem = merged.file.file_name.trim_end_matches(".pdf");
    assert_eq!(names, vec![format!("{stem}-part-1.pdf"), format!("{stem}-part-2.pdf")]);

    let second = service.download(split.files[1].id).unwrap();
    assert_eq!(markers(&second.bytes), vec!["B3", "B4"]);

    let recent = service.store().recent(10);
    let kinds: Vec<OperationKind> = recent.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![OperationKind::Split, OperationKind::Merge]);
    assert!(recent.iter().all(|op| op.status == OperationStatus::Completed));
}

#[test]
fn test_merge_response_wire_shape() {
    let service = PdfService::new(MemoryStore::new());
    let a = upload(&service, "a.pdf", build_pdf("A", 1));
    let b = upload(&service, "b.pdf", build_pdf("B", 1));

    let response = service
        .merge(&MergeRequest {
            file_ids: vec![a, b],
            options: None,
        })
        .unwrap();
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["message"], "PDFs merged successfully");
    assert_eq!(value["file"]["pageCount"], 2);
    assert!(value["file"]["fileName"].as_str().unwrap().starts_with("merged-"));
    assert!(value["file"].get("storageLocation").is_none());
    assert_eq!(value["operation"]["kind"], "merge");
    assert_eq!(value["operation"]["sourceFileIds"], json!([a, b]));
}

#[test]
fn test_failed_split_persists_nothing() {
    let service = PdfService::new(MemoryStore::new());
    let id = upload(&service, "ten.pdf", build_pdf("A", 10));

    let request: SplitRequest = serde_json::from_value(json!({
        "fileId": id,
        "options": { "splitMode": "ranges", "ranges": ["2-4", "11"] }
    }))
    .unwrap();
    let err = service.split(&request).unwrap_err();

    assert!(matches!(err, PdfOpsError::InvalidRange { .. }));
    assert_eq!(service.store().list().len(), 1);

    let recent = service.store().recent(1);
    assert_eq!(recent[0].status, OperationStatus::Failed);
    assert_eq!(recent[0].result_file_id, None);
    assert!(recent[0].message.contains("'11'"));
}

#[test]
fn test_compress_reports_truthful_percent() {
    let service = PdfService::new(MemoryStore::new());
    let id = upload(&service, "photo.pdf", image_pdf(280, 140));

    let response = service
        .compress(&CompressRequest {
            file_id: id,
            options: serde_json::from_value(json!({ "quality": 30 })).unwrap(),
        })
        .unwrap();

    assert_eq!(response.file.file_name, "compressed-photo.pdf");
    assert!(response.compression_percent > 0);
    assert!(
        response
            .operation
            .message
            .ends_with(&format!("({}% reduction)", response.compression_percent))
    );

    let stored = service.store().metadata(response.file.id).unwrap();
    assert!(stored.processed_size.unwrap() < stored.original_size);
}

#[test]
fn test_unknown_ids_are_not_found() {
    let service = PdfService::new(MemoryStore::new());

    let err = service
        .compress(&CompressRequest {
            file_id: 99,
            options: None,
        })
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.exit_code(), 2);
    assert!(service.store().list().is_empty());
}
