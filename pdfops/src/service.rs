//! Request-level operations over a store.
//!
//! [`PdfService`] plays the part of the HTTP layer without a transport: it
//! resolves file ids, validates options once, runs an engine and persists
//! the results. Results are stored only after the engine returned
//! successfully, and every invocation leaves exactly one terminal record in
//! the operation log, failed ones included.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::compress::{CompressionReport, Compressor};
use crate::config::{
    CompressOptions, MergeOptions, RawCompressOptions, RawMergeOptions, RawSplitOptions,
    SplitOptions,
};
use crate::error::{PdfOpsError, Result};
use crate::inspect::inspect;
use crate::merge::{MIN_SOURCES, Merger};
use crate::split::Splitter;
use crate::store::{
    FileStore, NewFile, NewOperation, OperationKind, OperationRecord, OperationStatus,
    OperationStore, StoredFile, StoredFileSummary,
};
use crate::utils::{file_stem, unix_millis};

/// Content type of every served document.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Storage quota used for usage statistics, in megabytes.
pub const STORAGE_LIMIT_MB: u64 = 2 * 1024;

/// Body of a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Files to merge, in order.
    pub file_ids: Vec<u64>,
    /// Merge options.
    #[serde(default)]
    pub options: Option<RawMergeOptions>,
}

/// Body of a split request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    /// File to split.
    pub file_id: u64,
    /// Split options.
    #[serde(default)]
    pub options: RawSplitOptions,
}

/// Body of a compress request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    /// File to compress.
    pub file_id: u64,
    /// Compress options.
    #[serde(default)]
    pub options: Option<RawCompressOptions>,
}

/// A named buffer to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Display name.
    pub file_name: String,
    /// Document bytes.
    pub bytes: Vec<u8>,
}

/// Response to a merge request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    /// Status message.
    pub message: String,
    /// The merged file.
    pub file: StoredFileSummary,
    /// The recorded operation.
    pub operation: OperationRecord,
}

/// Response to a split request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResponse {
    /// Status message.
    pub message: String,
    /// The result files, in partition order.
    pub files: Vec<StoredFileSummary>,
    /// The recorded operation.
    pub operation: OperationRecord,
}

/// Response to a compress request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    /// Status message.
    pub message: String,
    /// The compressed file.
    pub file: StoredFileSummary,
    /// The recorded operation.
    pub operation: OperationRecord,
    /// Rounded size reduction; negative when the file grew.
    pub compression_percent: i64,
}

/// Response to an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Status message.
    pub message: String,
    /// The stored files, in upload order.
    pub files: Vec<StoredFileSummary>,
}

/// A document ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Document bytes.
    pub bytes: Vec<u8>,
    /// Always [`PDF_CONTENT_TYPE`].
    pub content_type: &'static str,
    /// Name to save the attachment as.
    pub file_name: String,
}

impl Download {
    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// An operation with its files resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// The recorded operation.
    #[serde(flatten)]
    pub operation: OperationRecord,
    /// The result file, if it still exists.
    pub result_file: Option<StoredFileSummary>,
    /// Source files that still exist.
    pub source_files: Vec<StoredFileSummary>,
}

/// Storage usage figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatistics {
    /// Number of recorded operations.
    pub files_processed: usize,
    /// Sum of stored files' original sizes, in megabytes.
    pub storage_used_mb: f64,
    /// `storage_used_mb` as a percentage of the quota.
    pub storage_percentage: f64,
    /// The quota, in megabytes.
    pub storage_limit_mb: u64,
}

/// Operations over a store implementing both [`FileStore`] and
/// [`OperationStore`].
#[derive(Debug)]
pub struct PdfService<S> {
    store: S,
    merger: Merger,
    splitter: Splitter,
    compressor: Compressor,
}

impl<S> PdfService<S>
where
    S: FileStore + OperationStore,
{
    /// Create a service over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            merger: Merger::new(),
            splitter: Splitter::new(),
            compressor: Compressor::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and store uploaded documents.
    ///
    /// Every buffer is decoded before anything is stored.
    ///
    /// # Errors
    ///
    /// `InvalidOptions` for an empty upload, `MalformedDocument` naming the
    /// first buffer that does not decode.
    pub fn upload(&self, uploads: Vec<Upload>) -> Result<UploadResponse> {
        if uploads.is_empty() {
            return Err(PdfOpsError::invalid_options("No files uploaded"));
        }

        let page_counts = uploads
            .iter()
            .enumerate()
            .map(|(index, upload)| {
                inspect(&upload.bytes)
                    .map(|info| info.page_count)
                    .map_err(|e| reindex(e, index))
            })
            .collect::<Result<Vec<_>>>()?;

        let files = uploads
            .into_iter()
            .zip(page_counts)
            .map(|(upload, page_count)| {
                let file = NewFile {
                    file_name: upload.file_name,
                    original_size: upload.bytes.len() as u64,
                    processed_size: None,
                    page_count,
                };
                (upload.bytes, file)
            })
            .collect();
        let stored = self.persist_all(files)?;

        info!(files = stored.len(), "uploaded files");

        Ok(UploadResponse {
            message: "Files uploaded successfully".to_string(),
            files: stored.iter().map(StoredFile::summary).collect(),
        })
    }

    /// Merge stored files into a new stored file.
    ///
    /// # Errors
    ///
    /// `InvalidOptions`, `InsufficientInputs`, `FileNotFound`, or any
    /// merge engine error. Nothing is stored on error.
    pub fn merge(&self, request: &MergeRequest) -> Result<MergeResponse> {
        let options = to_json(&request.options);

        match self.run_merge(request) {
            Ok(file) => {
                let message = format!(
                    "Merged {} files into one PDF with {} pages",
                    request.file_ids.len(),
                    file.page_count
                );
                let operation = self.record_completed(
                    OperationKind::Merge,
                    request.file_ids.clone(),
                    Some(file.id),
                    options,
                    message,
                );
                Ok(MergeResponse {
                    message: "PDFs merged successfully".to_string(),
                    file: file.summary(),
                    operation,
                })
            }
            Err(e) => Err(self.record_failed(OperationKind::Merge, request.file_ids.clone(), options, e)),
        }
    }

    fn run_merge(&self, request: &MergeRequest) -> Result<StoredFile> {
        let options = match &request.options {
            Some(raw) => MergeOptions::try_from(raw)?,
            None => MergeOptions::default(),
        };

        if request.file_ids.len() < MIN_SOURCES {
            return Err(PdfOpsError::InsufficientInputs {
                required: MIN_SOURCES,
                provided: request.file_ids.len(),
            });
        }

        let (files, buffers) = self.resolve_all(&request.file_ids)?;
        let output = self.merger.merge(&buffers, &options)?;

        let file = NewFile {
            file_name: format!("merged-{}.pdf", unix_millis()),
            original_size: files.iter().map(|f| f.original_size).sum(),
            processed_size: Some(output.bytes.len() as u64),
            page_count: output.page_count,
        };
        self.store.put(output.bytes, file)
    }

    /// Split a stored file into new stored files.
    ///
    /// # Errors
    ///
    /// `InvalidOptions`, `FileNotFound`, or any split engine error. Nothing
    /// is stored on error.
    pub fn split(&self, request: &SplitRequest) -> Result<SplitResponse> {
        let options = to_json(&request.options);
        let sources = vec![request.file_id];

        match self.run_split(request) {
            Ok(files) => {
                let message = format!("Split PDF into {} files", files.len());
                let operation = self.record_completed(
                    OperationKind::Split,
                    sources,
                    files.first().map(|f| f.id),
                    options,
                    message,
                );
                Ok(SplitResponse {
                    message: "PDF split successfully".to_string(),
                    files: files.iter().map(StoredFile::summary).collect(),
                    operation,
                })
            }
            Err(e) => Err(self.record_failed(OperationKind::Split, sources, options, e)),
        }
    }

    fn run_split(&self, request: &SplitRequest) -> Result<Vec<StoredFile>> {
        let options = SplitOptions::try_from(&request.options)?;
        let source = self.store.metadata(request.file_id)?;
        let bytes = self.store.get(request.file_id)?;

        let parts = self.splitter.split(&bytes, &options)?;
        let stem = file_stem(&source.file_name);

        let files = parts
            .into_iter()
            .map(|part| {
                let file = NewFile {
                    file_name: format!("{stem}-{}.pdf", part.suffix),
                    original_size: source.original_size,
                    processed_size: Some(part.bytes.len() as u64),
                    page_count: part.page_count,
                };
                (part.bytes, file)
            })
            .collect();
        self.persist_all(files)
    }

    /// Compress a stored file into a new stored file.
    ///
    /// The reported percentage compares the compressed bytes with the bytes
    /// that were actually compressed and is not clamped. The stored result
    /// keeps the source's `original_size` as its lineage size.
    ///
    /// # Errors
    ///
    /// `InvalidOptions`, `FileNotFound`, or any compress engine error.
    /// Nothing is stored on error.
    pub fn compress(&self, request: &CompressRequest) -> Result<CompressResponse> {
        let options = to_json(&request.options);
        let sources = vec![request.file_id];

        match self.run_compress(request) {
            Ok((file, report)) => {
                let operation = self.record_completed(
                    OperationKind::Compress,
                    sources,
                    Some(file.id),
                    options,
                    report.summary(),
                );
                Ok(CompressResponse {
                    message: "PDF compressed successfully".to_string(),
                    file: file.summary(),
                    operation,
                    compression_percent: report.rounded_percent(),
                })
            }
            Err(e) => Err(self.record_failed(OperationKind::Compress, sources, options, e)),
        }
    }

    fn run_compress(&self, request: &CompressRequest) -> Result<(StoredFile, CompressionReport)> {
        let options = match &request.options {
            Some(raw) => CompressOptions::try_from(raw)?,
            None => CompressOptions::default(),
        };
        let source = self.store.metadata(request.file_id)?;
        let bytes = self.store.get(request.file_id)?;

        let output = self.compressor.compress(&bytes, &options)?;
        let report = output.report;

        let file = self.store.put(
            output.bytes,
            NewFile {
                file_name: format!("compressed-{}", source.file_name),
                original_size: source.original_size,
                processed_size: Some(report.compressed_size),
                page_count: report.page_count,
            },
        )?;
        Ok((file, report))
    }

    /// Bytes and attachment metadata of a stored file.
    ///
    /// # Errors
    ///
    /// `FileNotFound` for an unknown id.
    pub fn download(&self, id: u64) -> Result<Download> {
        let file = self.store.metadata(id)?;
        let bytes = self.store.get(id)?;
        Ok(Download {
            bytes,
            content_type: PDF_CONTENT_TYPE,
            file_name: file.file_name,
        })
    }

    /// Up to `limit` recent operations with their files resolved.
    pub fn activities(&self, limit: usize) -> Vec<Activity> {
        self.store
            .recent(limit)
            .into_iter()
            .map(|operation| {
                let result_file = operation
                    .result_file_id
                    .and_then(|id| self.store.metadata(id).ok())
                    .map(|f| f.summary());
                let source_files = operation
                    .source_file_ids
                    .iter()
                    .filter_map(|&id| self.store.metadata(id).ok())
                    .map(|f| f.summary())
                    .collect();
                Activity {
                    operation,
                    result_file,
                    source_files,
                }
            })
            .collect()
    }

    /// Storage usage against [`STORAGE_LIMIT_MB`].
    pub fn statistics(&self) -> UsageStatistics {
        let total: u64 = self.store.list().iter().map(|f| f.original_size).sum();
        let storage_used_mb = total as f64 / (1024.0 * 1024.0);
        UsageStatistics {
            files_processed: self.store.recent(usize::MAX).len(),
            storage_used_mb,
            storage_percentage: storage_used_mb / STORAGE_LIMIT_MB as f64 * 100.0,
            storage_limit_mb: STORAGE_LIMIT_MB,
        }
    }

    fn resolve_all(&self, ids: &[u64]) -> Result<(Vec<StoredFile>, Vec<Vec<u8>>)> {
        let mut files = Vec::with_capacity(ids.len());
        let mut buffers = Vec::with_capacity(ids.len());
        for &id in ids {
            files.push(self.store.metadata(id)?);
            buffers.push(self.store.get(id)?);
        }
        Ok((files, buffers))
    }

    /// Store every buffer or none of them.
    fn persist_all(&self, files: Vec<(Vec<u8>, NewFile)>) -> Result<Vec<StoredFile>> {
        let mut stored = Vec::with_capacity(files.len());
        for (bytes, file) in files {
            match self.store.put(bytes, file) {
                Ok(file) => stored.push(file),
                Err(e) => {
                    for file in &stored {
                        self.store.delete(file.id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    fn record_completed(
        &self,
        kind: OperationKind,
        source_file_ids: Vec<u64>,
        result_file_id: Option<u64>,
        options: Value,
        message: String,
    ) -> OperationRecord {
        info!(?kind, sources = ?source_file_ids, result = ?result_file_id, %message, "operation completed");
        self.store.record(NewOperation {
            kind,
            source_file_ids,
            result_file_id,
            options,
            status: OperationStatus::Completed,
            message,
        })
    }

    fn record_failed(
        &self,
        kind: OperationKind,
        source_file_ids: Vec<u64>,
        options: Value,
        error: PdfOpsError,
    ) -> PdfOpsError {
        warn!(?kind, sources = ?source_file_ids, error = %error, "operation failed");
        self.store.record(NewOperation {
            kind,
            source_file_ids,
            result_file_id: None,
            options,
            status: OperationStatus::Failed,
            message: error.public_message(),
        });
        error
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Attribute a single-buffer decode failure to its position in a batch.
fn reindex(error: PdfOpsError, index: usize) -> PdfOpsError {
    match error {
        PdfOpsError::MalformedDocument { reason, .. } => PdfOpsError::MalformedDocument { index, reason },
        other => other,
    }
}
