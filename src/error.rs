//! Error types for the mistral-pdf2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2MdError`] is **fatal and local**: something on this machine is wrong
//!   (missing input file, unwritable output, invalid configuration, broken
//!   credential file). Returned as `Err(Pdf2MdError)` from the builder, the
//!   credential store and the output writers.
//!
//! * [`OcrError`] is **per attempt**: one remote operation failed. Inside the
//!   primary path these are caught and trigger the fallback; the fallback's
//!   error is terminal and ends up in a [`ConversionFailure`] together with
//!   the primary-path error that preceded it.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal local errors returned by the mistral-pdf2md library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but does not name a regular file.
    #[error("Invalid input '{input}': not a regular file")]
    InvalidInput { input: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The per-user credential file could not be read or written.
    #[error("Credential store '{path}': {detail}")]
    CredentialStore { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The remote operation an [`OcrError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `POST /v1/files`
    Upload,
    /// `GET /v1/files/{id}/url`
    SignedUrl,
    /// `POST /v1/ocr` with a `document_url`
    Ocr,
    /// `POST /v1/ocr` with the file as multipart
    DirectUpload,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Upload => "File upload",
            Operation::SignedUrl => "File URL",
            Operation::Ocr => "OCR API",
            Operation::DirectUpload => "Fallback OCR",
        })
    }
}

/// A failed conversion attempt.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Missing API key, or the service answered 401.
    #[error("Authentication failed: {detail}")]
    Authentication { detail: String },

    /// The input exceeds the direct-upload ceiling; nothing was sent.
    #[error("File too large for direct processing ({size} bytes, limit {limit}). Try with a smaller PDF.")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Any other non-2xx answer. The body is echoed for diagnosis.
    #[error("{operation} error: {status} - {body}")]
    Upstream {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// 2xx answer that could not be decoded or lacks a required field.
    #[error("{operation} returned an unexpected response: {detail}")]
    InvalidResponse { operation: Operation, detail: String },

    /// The response decoded fine but carried no markdown text.
    #[error("No markdown content found in the {0} response.")]
    ExtractionEmpty(Operation),

    /// Connection failure or timeout.
    #[error("{operation} request failed: {detail}")]
    Network {
        operation: Operation,
        detail: String,
        timeout: bool,
    },

    /// The request could not be prepared locally.
    #[error(transparent)]
    Input(#[from] Pdf2MdError),
}

/// Coarse classification of terminal outcomes, for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    PayloadTooLarge,
    Upstream,
    ExtractionEmpty,
    Network,
    Input,
    Cancelled,
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::Authentication { .. } => ErrorKind::Authentication,
            OcrError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            OcrError::Upstream { .. } | OcrError::InvalidResponse { .. } => ErrorKind::Upstream,
            OcrError::ExtractionEmpty(_) => ErrorKind::ExtractionEmpty,
            OcrError::Network { .. } => ErrorKind::Network,
            OcrError::Input(_) => ErrorKind::Input,
        }
    }

    /// HTTP status of the failed call, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            OcrError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failure of a conversion run.
///
/// When the fallback path ran, `primary` holds the error that made the
/// primary path give up, so callers can see why both paths failed.
#[derive(Debug)]
pub struct ConversionFailure {
    pub error: OcrError,
    pub primary: Option<OcrError>,
}

impl ConversionFailure {
    /// A failure that happened before any remote path was attempted.
    pub fn preflight(error: impl Into<OcrError>) -> Self {
        Self {
            error: error.into(),
            primary: None,
        }
    }

    pub fn after_fallback(primary: OcrError, error: OcrError) -> Self {
        Self {
            error,
            primary: Some(primary),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Short, non-technical message suitable for a status line or dialog.
    pub fn user_message(&self) -> String {
        if let OcrError::PayloadTooLarge { limit, .. } = &self.error {
            return format!(
                "PDF file is too large. Please try a smaller file (under {}).",
                human_size(*limit)
            );
        }

        match self.kind() {
            ErrorKind::Authentication => {
                "Invalid API key. Please check your Mistral API key and try again."
            }
            ErrorKind::PayloadTooLarge => "PDF file is too large. Please try a smaller file.",
            ErrorKind::ExtractionEmpty => {
                "Could not extract content from the PDF. Please try a different file."
            }
            ErrorKind::Upstream => "OCR processing failed. Please try again or use a different PDF.",
            ErrorKind::Network => "Network error. Please check your internet connection.",
            ErrorKind::Input => "Could not read the selected file.",
            ErrorKind::Cancelled => "Conversion cancelled.",
        }
        .to_string()
    }
}

/// `5000000` → `5MB`, `2500000` → `2.5MB`, smaller sizes in bytes.
fn human_size(bytes: u64) -> String {
    const MB: u64 = 1_000_000;
    if bytes < MB {
        format!("{bytes} bytes")
    } else if bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.primary {
            Some(primary) => write!(
                f,
                "Could not process PDF file. Original error: {primary}, Secondary error: {}",
                self.error
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ConversionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
