//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one step. The orchestration that
//! strings them together (primary path, fallback, cancellation checkpoints)
//! lives in [`crate::convert`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ transport ──────────────────────────────▶ extract
//! (path)    upload → signed URL → OCR    (primary)    (JSON → markdown)
//!           multipart OCR                (fallback)
//! ```
//!
//! 1. [`input`]  validate the local path and load the file bytes
//! 2. [`transport`]  the three remote endpoints, bearer auth and status
//!    classification; the only stage with network I/O
//! 3. [`extract`]  locate markdown text in a response of unknown shape

pub mod extract;
pub mod input;
pub mod transport;
