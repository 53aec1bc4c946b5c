//! pdfops - Merge, split and compress PDF documents.
//!
//! The crate is organised around a small document codec and three engines
//! that run on top of it:
//!
//! - **Merge**: concatenate or interleave the pages of two or more documents,
//!   optionally retaining their outlines
//! - **Split**: one document per page, per range expression, or per chunk
//!   of N pages
//! - **Compress**: structural deduplication, with image resampling below
//!   quality 70
//!
//! Every engine call is all-or-nothing and works on freshly decoded
//! documents; input buffers are never modified. [`service::PdfService`]
//! wraps the engines with a file store and an operation log.
//!
//! # Examples
//!
//! ## Engines
//!
//! ```no_run
//! use pdfops::config::{CompressOptions, MergeOptions, SplitOptions};
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfops::Result<()> {
//! let merged = pdfops::merge::merge(&[a, b], &MergeOptions::default())?;
//! println!("merged into {} pages", merged.page_count);
//!
//! let parts = pdfops::split::split(&merged.bytes, &SplitOptions::every(2)?)?;
//! println!("split into {} parts", parts.len());
//!
//! let compressed = pdfops::compress::compress(&merged.bytes, &CompressOptions::default())?;
//! println!("{}", compressed.report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Service
//!
//! ```no_run
//! use pdfops::service::{MergeRequest, PdfService, Upload};
//! use pdfops::store::MemoryStore;
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfops::Result<()> {
//! let service = PdfService::new(MemoryStore::new());
//! let uploaded = service.upload(vec![
//!     Upload { file_name: "a.pdf".into(), bytes: a },
//!     Upload { file_name: "b.pdf".into(), bytes: b },
//! ])?;
//!
//! let ids = uploaded.files.iter().map(|f| f.id).collect();
//! let response = service.merge(&MergeRequest { file_ids: ids, options: None })?;
//! println!("{}", response.operation.message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod compress;
pub mod config;
pub mod error;
pub mod inspect;
pub mod merge;
pub mod service;
pub mod split;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use codec::{PdfDocument, PdfReader, PdfWriter};
pub use config::{CompressOptions, MergeMode, MergeOptions, Quality, RangeSpec, SplitOptions};
pub use error::{PdfOpsError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
