//! # mistral-pdf2md
//!
//! Convert PDF documents to Markdown with the Mistral OCR API.
//!
//! All document understanding happens on the service. This crate drives the
//! remote calls, falls back to a second submission method when the first one
//! fails, and digs the markdown out of whatever JSON comes back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the local path, read the bytes
//!  ├─ 2. Primary   POST /v1/files → GET /v1/files/{id}/url → POST /v1/ocr
//!  ├─ 3. Fallback  POST /v1/ocr (multipart, ≤ 5 MB)   only if 2. failed
//!  ├─ 4. Extract   `text`, else joined `pages[].markdown`, else diagnostic
//!  └─ 5. Output    Success / Cancelled / Failed(primary + fallback error)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mistral_pdf2md::{convert, ConversionConfig, ConversionRequest, ConversionResult};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ConversionConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY").unwrap_or_default())
//!         .build()
//!         .unwrap();
//!     let request = ConversionRequest::new("document.pdf");
//!
//!     match convert(&request, &config).await {
//!         ConversionResult::Success(out) => println!("{}", out.markdown),
//!         ConversionResult::Cancelled => eprintln!("cancelled"),
//!         ConversionResult::Failed(f) => eprintln!("{}\n{f}", f.user_message()),
//!     }
//! }
//! ```
//!
//! For a UI that must stay responsive, [`convert_stream`] runs the same
//! conversion on a background task and delivers progress and the result
//! over a channel.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file};
pub use credentials::CredentialStore;
pub use error::{ConversionFailure, ErrorKind, OcrError, Operation, Pdf2MdError};
pub use output::{ConversionOutput, ConversionResult, ExtractionSource, Route};
pub use pipeline::extract::{extract, Extraction};
pub use progress::{ConversionProgressCallback, ConversionStage, ProgressCallback};
pub use request::{CancellationFlag, ConversionRequest};
pub use stream::{convert_stream, ConversionEvent, ConversionHandle};
