//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! each stage transition of a run, the switch to the fallback path, and the
//! terminal result.
//!
//! Callbacks fire on the task running the conversion. A presentation layer
//! that must not be touched from another thread should forward the events
//! instead (see [`crate::stream::convert_stream`], which does exactly that
//! over a channel).
//!
//! # Example
//!
//! ```rust
//! use mistral_pdf2md::{ConversionConfig, ConversionProgressCallback, ConversionStage};
//! use std::sync::{Arc, Mutex};
//!
//! struct Recorder(Mutex<Vec<String>>);
//!
//! impl ConversionProgressCallback for Recorder {
//!     fn on_stage(&self, stage: ConversionStage) {
//!         self.0.lock().unwrap().push(stage.message().to_string());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Recorder(Mutex::new(Vec::new()))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::OcrError;
use crate::output::ConversionResult;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Checkpoints of a conversion run, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    /// Loading and validating the input file.
    Preparing,
    /// Primary step 1: `POST /v1/files`.
    Uploading,
    /// Primary step 2: `GET /v1/files/{id}/url`.
    FetchingUrl,
    /// Primary step 3: `POST /v1/ocr` with the signed URL.
    Processing,
    /// Fallback: `POST /v1/ocr` with the file itself.
    DirectUpload,
    /// Locating markdown in the response.
    Extracting,
}

impl ConversionStage {
    /// Status text shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            ConversionStage::Preparing => "Preparing PDF file...",
            ConversionStage::Uploading => "Uploading PDF file...",
            ConversionStage::FetchingUrl => "Getting file access URL...",
            ConversionStage::Processing => "Processing PDF with OCR (this may take a while)...",
            ConversionStage::DirectUpload => "Uploading and processing file directly...",
            ConversionStage::Extracting => "Extracting markdown content...",
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Status text announcing the fallback path.
pub fn fallback_message(primary_error: &OcrError) -> String {
    format!("Trying direct file upload... (error: {primary_error})")
}

/// Called by the orchestrator as a run moves through its checkpoints.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when a stage begins, after its cancellation checkpoint passed.
    fn on_stage(&self, stage: ConversionStage) {
        let _ = stage;
    }

    /// Called once if the primary path failed and the fallback is starting.
    fn on_fallback(&self, primary_error: &OcrError) {
        let _ = primary_error;
    }

    /// Called exactly once with the terminal result.
    fn on_conversion_complete(&self, result: &ConversionResult) {
        let _ = result;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        stages: AtomicUsize,
        fallbacks: AtomicUsize,
        completions: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_stage(&self, _stage: ConversionStage) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fallback(&self, _primary_error: &OcrError) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _result: &ConversionResult) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(ConversionStage::Uploading);
        cb.on_fallback(&OcrError::ExtractionEmpty(Operation::Ocr));
        cb.on_conversion_complete(&ConversionResult::Cancelled);
    }

    #[test]
    fn tracking_callback_through_arc_dyn() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();

        cb.on_stage(ConversionStage::Preparing);
        cb.on_stage(ConversionStage::Uploading);
        cb.on_fallback(&OcrError::Authentication {
            detail: "401".into(),
        });
        cb.on_stage(ConversionStage::DirectUpload);
        cb.on_conversion_complete(&ConversionResult::Cancelled);

        assert_eq!(tracker.stages.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallback_message_embeds_primary_error() {
        let msg = fallback_message(&OcrError::Upstream {
            operation: Operation::Upload,
            status: 500,
            body: "down".into(),
        });
        assert_eq!(
            msg,
            "Trying direct file upload... (error: File upload error: 500 - down)"
        );
    }
}
