//! Conversion entry points and the primary → fallback orchestration.
//!
//! ```text
//! preflight   key? ── file readable? ──────────────────────────┐ (Failed, no network)
//! primary     upload ─▶ signed URL ─▶ OCR(document_url) ─▶ extract ──▶ Success
//!                │           │              │                 │ blank
//!                └───────────┴──────────────┴─────────────────┘
//!                                     │ first error
//! fallback    size ≤ ceiling? ─▶ OCR(multipart) ─▶ extract ──▶ Success
//!                │                    │               │ blank
//!                └────────────────────┴───────────────┴──▶ Failed(primary + fallback)
//! ```
//!
//! Every arrow is a cancellation checkpoint. The run is strictly sequential:
//! no call is issued before the previous one has returned, and each path
//! runs at most once.

use crate::config::ConversionConfig;
use crate::error::{ConversionFailure, OcrError, Operation, Pdf2MdError};
use crate::output::{write_markdown, ConversionOutput, ConversionResult, Route};
use crate::pipeline::extract::{self, Extraction};
use crate::pipeline::input::{self, Document};
use crate::pipeline::transport::OcrClient;
use crate::progress::{ConversionProgressCallback, ConversionStage, NoopProgressCallback};
use crate::request::ConversionRequest;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a local PDF to Markdown.
///
/// This is the primary entry point for the library. It never returns an
/// `Err`: every outcome, including local problems such as a missing file or
/// API key, is folded into the returned [`ConversionResult`].
///
/// Progress is reported to `config.progress_callback`, if set.
pub async fn convert(request: &ConversionRequest, config: &ConversionConfig) -> ConversionResult {
    match config.progress_callback.as_deref() {
        Some(cb) => run(request, config, cb).await,
        None => run(request, config, &NoopProgressCallback).await,
    }
}

/// Convert a PDF and, on success, write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. Nothing
/// is written when the run is cancelled or fails.
pub async fn convert_to_file(
    request: &ConversionRequest,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, Pdf2MdError> {
    let result = convert(request, config).await;
    if let ConversionResult::Success(ref output) = result {
        let path = output_path.as_ref();
        write_markdown(path, &output.markdown).await?;
        info!("Saved markdown to {}", path.display());
    }
    Ok(result)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally, so it must not be called
/// from inside an async context.
pub fn convert_sync(request: &ConversionRequest, config: &ConversionConfig) -> ConversionResult {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(convert(request, config)),
        Err(e) => ConversionResult::Failed(ConversionFailure::preflight(Pdf2MdError::Internal(
            format!("Failed to create tokio runtime: {e}"),
        ))),
    }
}

/// Run one conversion, reporting to `progress`, and announce the result.
pub(crate) async fn run(
    request: &ConversionRequest,
    config: &ConversionConfig,
    progress: &dyn ConversionProgressCallback,
) -> ConversionResult {
    let start = Instant::now();
    info!("Starting conversion: {}", request.path().display());

    let result = orchestrate(request, config, progress, start).await;

    match &result {
        ConversionResult::Success(out) => info!(
            "Conversion complete via {:?} path: {} chars, {}ms",
            out.route,
            out.markdown.len(),
            out.duration_ms
        ),
        ConversionResult::Cancelled => info!("Conversion cancelled"),
        ConversionResult::Failed(f) => warn!("Conversion failed: {f}"),
    }
    progress.on_conversion_complete(&result);
    result
}

/// What a path produced when it did not fail.
enum Outcome {
    Extracted(Extraction),
    Cancelled,
}

async fn orchestrate(
    request: &ConversionRequest,
    config: &ConversionConfig,
    progress: &dyn ConversionProgressCallback,
    start: Instant,
) -> ConversionResult {
    if !enter(request, progress, ConversionStage::Preparing) {
        return ConversionResult::Cancelled;
    }

    // ── Preflight: key and input, no network ─────────────────────────────
    let Some(api_key) = request.resolve_api_key(config.api_key.as_deref()) else {
        return ConversionResult::Failed(ConversionFailure::preflight(
            OcrError::Authentication {
                detail: "Please enter your Mistral API key".into(),
            },
        ));
    };
    let client = match OcrClient::new(api_key, config) {
        Ok(client) => client,
        Err(e) => return ConversionResult::Failed(ConversionFailure::preflight(e)),
    };
    let document = match input::load_document(request.path()).await {
        Ok(document) => document,
        Err(e) => return ConversionResult::Failed(ConversionFailure::preflight(e)),
    };

    // ── Primary path ─────────────────────────────────────────────────────
    let primary_error = match primary_path(&client, &document, request, progress).await {
        Ok(Outcome::Extracted(extraction)) => {
            return finish(request, extraction, Route::Primary, start)
        }
        Ok(Outcome::Cancelled) => return ConversionResult::Cancelled,
        Err(e) => e,
    };

    if request.is_cancelled() {
        return ConversionResult::Cancelled;
    }

    // ── Fallback path ────────────────────────────────────────────────────
    warn!("Primary path failed, trying direct upload: {primary_error}");
    progress.on_fallback(&primary_error);

    match fallback_path(&client, &document, request, config, progress).await {
        Ok(Outcome::Extracted(extraction)) => finish(request, extraction, Route::Fallback, start),
        Ok(Outcome::Cancelled) => ConversionResult::Cancelled,
        Err(_) if request.is_cancelled() => ConversionResult::Cancelled,
        Err(e) => ConversionResult::Failed(ConversionFailure::after_fallback(primary_error, e)),
    }
}

/// Upload, fetch the signed URL, submit the OCR job, extract.
async fn primary_path(
    client: &OcrClient,
    document: &Document,
    request: &ConversionRequest,
    progress: &dyn ConversionProgressCallback,
) -> Result<Outcome, OcrError> {
    if !enter(request, progress, ConversionStage::Uploading) {
        return Ok(Outcome::Cancelled);
    }
    let file = client.upload_file(document).await?;

    if !enter(request, progress, ConversionStage::FetchingUrl) {
        return Ok(Outcome::Cancelled);
    }
    let url = client.signed_url(&file).await?;

    if !enter(request, progress, ConversionStage::Processing) {
        return Ok(Outcome::Cancelled);
    }
    let response = client.process_document_url(&url).await?;

    if !enter(request, progress, ConversionStage::Extracting) {
        return Ok(Outcome::Cancelled);
    }
    extract_non_blank(&response, Operation::Ocr)
}

/// Single multipart submission of the raw file.
async fn fallback_path(
    client: &OcrClient,
    document: &Document,
    request: &ConversionRequest,
    config: &ConversionConfig,
    progress: &dyn ConversionProgressCallback,
) -> Result<Outcome, OcrError> {
    let limit = config.max_direct_upload_bytes;
    if document.size() > limit {
        return Err(OcrError::PayloadTooLarge {
            size: document.size(),
            limit,
        });
    }

    if !enter(request, progress, ConversionStage::DirectUpload) {
        return Ok(Outcome::Cancelled);
    }
    let response = client.process_upload(document).await?;

    if !enter(request, progress, ConversionStage::Extracting) {
        return Ok(Outcome::Cancelled);
    }
    extract_non_blank(&response, Operation::DirectUpload)
}

/// Cancellation checkpoint; announces `stage` when the run may proceed.
fn enter(
    request: &ConversionRequest,
    progress: &dyn ConversionProgressCallback,
    stage: ConversionStage,
) -> bool {
    if request.is_cancelled() {
        debug!("Cancellation observed before stage {:?}", stage);
        return false;
    }
    info!("{}", stage.message());
    progress.on_stage(stage);
    true
}

fn extract_non_blank(response: &serde_json::Value, op: Operation) -> Result<Outcome, OcrError> {
    let extraction = extract::classify(response);
    if extraction.is_blank() {
        return Err(OcrError::ExtractionEmpty(op));
    }
    Ok(Outcome::Extracted(extraction))
}

fn finish(
    request: &ConversionRequest,
    extraction: Extraction,
    route: Route,
    start: Instant,
) -> ConversionResult {
    if request.is_cancelled() {
        return ConversionResult::Cancelled;
    }

    let source = extraction.source();
    if let Extraction::Diagnostic(ref text) = extraction {
        warn!("No markdown field in OCR response; returning diagnostic text ({} chars)", text.len());
    }

    ConversionResult::Success(ConversionOutput {
        markdown: extraction.into_markdown(),
        route,
        source,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::request::CancellationFlag;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StageLog(Mutex<Vec<ConversionStage>>);

    impl ConversionProgressCallback for StageLog {
        fn on_stage(&self, stage: ConversionStage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    fn offline_config() -> ConversionConfig {
        // Nothing listens here; preflight failures must not reach it.
        ConversionConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap()
    }

    #[test]
    fn convert_sync_without_key_is_authentication_failure() {
        let result = convert_sync(&ConversionRequest::new("whatever.pdf"), &offline_config());
        assert_eq!(result.error_kind(), Some(ErrorKind::Authentication));
        assert!(result.failure().unwrap().primary.is_none());
    }

    #[tokio::test]
    async fn missing_input_stops_after_preparing() {
        let log = StageLog::default();
        let request = ConversionRequest::new("/no/such/file.pdf").with_api_key("sk-test");

        let result = run(&request, &offline_config(), &log).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Input));
        assert_eq!(*log.0.lock().unwrap(), vec![ConversionStage::Preparing]);
    }

    #[tokio::test]
    async fn cancelled_request_emits_no_stage() {
        let log = StageLog::default();
        let flag = CancellationFlag::new();
        flag.cancel();
        let request = ConversionRequest::new("/no/such/file.pdf").with_cancellation(flag);

        let result = run(&request, &offline_config(), &log).await;

        assert!(result.is_cancelled());
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[test]
    fn blank_extraction_is_an_error() {
        let err = match extract_non_blank(&serde_json::json!({"pages": []}), Operation::Ocr) {
            Err(e) => e,
            Ok(_) => panic!("blank pages must not be extracted"),
        };
        assert_eq!(err.kind(), ErrorKind::ExtractionEmpty);
    }
}
