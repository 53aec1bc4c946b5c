//! Error types for pdfops.
//!
//! Every engine call is all-or-nothing, so an error always means that no
//! result document was produced. Errors fall into two classes:
//!
//! - **Caller errors**: the input bytes or the options were invalid
//!   (malformed document, too few inputs, bad page range, unknown file id).
//! - **Internal errors**: something failed that the caller cannot fix
//!   (encoder failure, I/O failure, broken invariants).

use std::io;

/// Result type alias for pdfops operations.
pub type Result<T> = std::result::Result<T, PdfOpsError>;

/// Main error type for pdfops operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfOpsError {
    /// An input buffer could not be decoded as a PDF document.
    #[error("Malformed PDF document (input #{index}): {reason}")]
    MalformedDocument {
        /// Zero-based position of the offending input.
        index: usize,
        /// What the decoder rejected.
        reason: String,
    },

    /// A business-rule floor on the number of inputs was not met.
    #[error("At least {required} files are required, got {provided}")]
    InsufficientInputs {
        /// Minimum number of inputs.
        required: usize,
        /// Number of inputs actually supplied.
        provided: usize,
    },

    /// A range expression references pages outside the document.
    #[error(
        "Invalid page range '{expression}': document has {page_count} page(s), \
         page numbers must be between 1 and {page_count}"
    )]
    InvalidRange {
        /// The offending range expression.
        expression: String,
        /// Page count of the source document.
        page_count: usize,
    },

    /// A range expression could not be parsed.
    #[error("Invalid page range syntax '{expression}': {reason}")]
    InvalidRangeSyntax {
        /// The offending range expression.
        expression: String,
        /// Why the expression was rejected.
        reason: String,
    },

    /// Encoding a constructed document failed.
    #[error("Failed to encode PDF document: {reason}")]
    CodecEncodeFailure {
        /// Underlying encoder message.
        reason: String,
    },

    /// Operation options were rejected at the boundary.
    #[error("Invalid options: {message}")]
    InvalidOptions {
        /// Description of the rejected option.
        message: String,
    },

    /// A file id does not resolve in the file store.
    #[error("File not found: {id}")]
    FileNotFound {
        /// The unknown identifier.
        id: u64,
    },

    /// A page index passed to the codec is outside the source document.
    #[error("Page index {index} is out of bounds for a document with {page_count} page(s)")]
    PageIndexOutOfBounds {
        /// Zero-based page index.
        index: usize,
        /// Page count of the source document.
        page_count: usize,
    },

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// An internal invariant did not hold.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl PdfOpsError {
    /// Create a MalformedDocument error.
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            index,
            reason: reason.into(),
        }
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(expression: impl Into<String>, page_count: usize) -> Self {
        Self::InvalidRange {
            expression: expression.into(),
            page_count,
        }
    }

    /// Create an InvalidRangeSyntax error.
    pub fn invalid_range_syntax(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRangeSyntax {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create a CodecEncodeFailure error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::CodecEncodeFailure {
            reason: reason.into(),
        }
    }

    /// Create an InvalidOptions error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check whether the caller's input caused this error.
    ///
    /// Caller errors are never worth retrying with the same input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument { .. }
                | Self::InsufficientInputs { .. }
                | Self::InvalidRange { .. }
                | Self::InvalidRangeSyntax { .. }
                | Self::InvalidOptions { .. }
                | Self::FileNotFound { .. }
        )
    }

    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileNotFound { .. } => 404,
            e if e.is_caller_error() => 400,
            _ => 500,
        }
    }

    /// Message that is safe to show to the caller.
    ///
    /// Internal errors are reduced to a generic message; their details
    /// belong in the logs.
    pub fn public_message(&self) -> String {
        if self.is_caller_error() {
            self.to_string()
        } else {
            "The document could not be processed due to an internal error".to_string()
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidOptions { .. } => 1,
            Self::InvalidRange { .. } => 1,
            Self::InvalidRangeSyntax { .. } => 1,
            Self::InsufficientInputs { .. } => 1,
            Self::FileNotFound { .. } => 2,
            Self::MalformedDocument { .. } => 3,
            Self::PageIndexOutOfBounds { .. } => 6,
            Self::CodecEncodeFailure { .. } => 6,
            Self::Internal { .. } => 6,
            Self::Io { .. } => 5,
        }
    }
}

impl From<lopdf::Error> for PdfOpsError {
    /// Graph-level failures after a successful decode are internal; decode
    /// failures are mapped to `MalformedDocument` by the reader instead.
    fn from(err: lopdf::Error) -> Self {
        Self::internal(format!("PDF object graph error: {err}"))
    }
}
