//! File and operation storage.
//!
//! The engines never see identifiers; the service resolves ids to bytes
//! through [`FileStore`] and records outcomes through [`OperationStore`].
//! Identifier generation belongs to the store implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{PdfOpsError, Result};
use crate::utils::unix_millis;

/// A persisted document and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Store-assigned identifier.
    pub id: u64,

    /// Display name, e.g. `report.pdf`.
    pub file_name: String,

    /// Size attributed to the file before processing.
    pub original_size: u64,

    /// Size of the stored bytes for engine results; `None` for uploads.
    pub processed_size: Option<u64>,

    /// Number of pages.
    pub page_count: usize,

    /// Where the bytes live.
    pub storage_location: String,

    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl StoredFile {
    /// The wire summary of this file.
    pub fn summary(&self) -> StoredFileSummary {
        StoredFileSummary {
            id: self.id,
            file_name: self.file_name.clone(),
            original_size: self.original_size,
            page_count: self.page_count,
        }
    }
}

/// The fields of a [`StoredFile`] exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileSummary {
    /// Store-assigned identifier.
    pub id: u64,
    /// Display name.
    pub file_name: String,
    /// Size in bytes attributed to the file before processing.
    pub original_size: u64,
    /// Number of pages.
    pub page_count: usize,
}

/// Metadata for a file about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    /// Display name.
    pub file_name: String,
    /// Size attributed to the file before processing.
    pub original_size: u64,
    /// Size of the processed bytes, if the file is an engine result.
    pub processed_size: Option<u64>,
    /// Number of pages.
    pub page_count: usize,
}

/// Kind of operation recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Merge several files into one.
    Merge,
    /// Split one file into several.
    Split,
    /// Re-encode one file for size.
    Compress,
}

/// Terminal state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// The engine succeeded and results were persisted.
    Completed,
    /// The operation failed and nothing was persisted.
    Failed,
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Store-assigned identifier.
    pub id: u64,
    /// What was done.
    pub kind: OperationKind,
    /// Inputs, in request order.
    pub source_file_ids: Vec<u64>,
    /// The (first) result file, if any.
    pub result_file_id: Option<u64>,
    /// Options as received.
    pub options: serde_json::Value,
    /// Terminal state.
    pub status: OperationStatus,
    /// Human-readable outcome.
    pub message: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// An operation about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    /// What was done.
    pub kind: OperationKind,
    /// Inputs, in request order.
    pub source_file_ids: Vec<u64>,
    /// The (first) result file, if any.
    pub result_file_id: Option<u64>,
    /// Options as received.
    pub options: serde_json::Value,
    /// Terminal state.
    pub status: OperationStatus,
    /// Human-readable outcome.
    pub message: String,
}

/// Byte storage for documents.
pub trait FileStore: Send + Sync {
    /// Bytes of file `id`.
    fn get(&self, id: u64) -> Result<Vec<u8>>;

    /// Metadata of file `id`.
    fn metadata(&self, id: u64) -> Result<StoredFile>;

    /// Store `bytes` and return the new file's metadata.
    fn put(&self, bytes: Vec<u8>, file: NewFile) -> Result<StoredFile>;

    /// Remove file `id`. Returns whether it existed.
    fn delete(&self, id: u64) -> bool;

    /// All stored files in id order.
    fn list(&self) -> Vec<StoredFile>;
}

/// Activity log of operations.
pub trait OperationStore: Send + Sync {
    /// Record a terminal operation.
    fn record(&self, operation: NewOperation) -> OperationRecord;

    /// Up to `limit` operations, newest first.
    fn recent(&self, limit: usize) -> Vec<OperationRecord>;
}

#[derive(Debug)]
struct Entry {
    file: StoredFile,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct Inner {
    files: BTreeMap<u64, Entry>,
    operations: Vec<OperationRecord>,
    next_file_id: u64,
    next_operation_id: u64,
}

/// In-memory implementation of both stores.
///
/// Identifiers are monotonic and start at 1; deleted ids are never reused.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                files: BTreeMap::new(),
                operations: Vec::new(),
                next_file_id: 1,
                next_operation_id: 1,
            }),
        }
    }

    fn location(id: u64) -> String {
        format!("memory://files/{id}")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore for MemoryStore {
    fn get(&self, id: u64) -> Result<Vec<u8>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .files
            .get(&id)
            .map(|entry| entry.bytes.clone())
            .ok_or(PdfOpsError::FileNotFound { id })
    }

    fn metadata(&self, id: u64) -> Result<StoredFile> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .files
            .get(&id)
            .map(|entry| entry.file.clone())
            .ok_or(PdfOpsError::FileNotFound { id })
    }

    fn put(&self, bytes: Vec<u8>, file: NewFile) -> Result<StoredFile> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_file_id;
        inner.next_file_id = id
            .checked_add(1)
            .ok_or_else(|| PdfOpsError::internal("file id space exhausted"))?;

        let stored = StoredFile {
            id,
            file_name: file.file_name,
            original_size: file.original_size,
            processed_size: file.processed_size,
            page_count: file.page_count,
            storage_location: Self::location(id),
            created_at: unix_millis() as u64,
        };
        inner.files.insert(
            id,
            Entry {
                file: stored.clone(),
                bytes,
            },
        );
        Ok(stored)
    }

    fn delete(&self, id: u64) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.files.remove(&id).is_some()
    }

    fn list(&self) -> Vec<StoredFile> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.files.values().map(|entry| entry.file.clone()).collect()
    }
}

impl OperationStore for MemoryStore {
    fn record(&self, operation: NewOperation) -> OperationRecord {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_operation_id;
        inner.next_operation_id += 1;

        let record = OperationRecord {
            id,
            kind: operation.kind,
            source_file_ids: operation.source_file_ids,
            result_file_id: operation.result_file_id,
            options: operation.options,
            status: operation.status,
            message: operation.message,
            created_at: unix_millis() as u64,
        };
        inner.operations.push(record.clone());
        record
    }

    fn recent(&self, limit: usize) -> Vec<OperationRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.operations.iter().rev().take(limit).cloned().collect()
    }
}
