//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The API key lives here (or on the
//! individual [`crate::ConversionRequest`]) and is passed explicitly into each
//! run; nothing in the library reads a process-wide key.

use crate::error::Pdf2MdError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Production endpoint of the Mistral API.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// OCR model requested on both the primary and the fallback path.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Largest file the direct multipart fallback will send.
pub const DEFAULT_MAX_DIRECT_UPLOAD_BYTES: u64 = 5_000_000;

/// Configuration for a PDF-to-Markdown conversion.
///
/// # Example
/// ```rust
/// use mistral_pdf2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .api_key("sk-test")
///     .request_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "mistral-ocr-latest");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// API key used when the request does not carry its own override.
    pub api_key: Option<String>,

    /// Scheme + host of the API, without a trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// OCR model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Size ceiling for the direct multipart fallback. Default: 5,000,000 bytes.
    ///
    /// Files above this are rejected locally with
    /// [`crate::error::OcrError::PayloadTooLarge`] before any request is sent.
    pub max_direct_upload_bytes: u64,

    /// Per-request timeout in seconds. Default: 300.
    ///
    /// OCR of a long document is a single blocking call on the service side,
    /// so this has to cover the whole job, not just the transfer.
    pub request_timeout_secs: u64,

    /// Receives stage transitions and the terminal result.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_direct_upload_bytes: DEFAULT_MAX_DIRECT_UPLOAD_BYTES,
            request_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_direct_upload_bytes", &self.max_direct_upload_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_direct_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_direct_upload_bytes = bytes;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2MdError::InvalidConfig("model must not be empty".into()));
        }
        if c.request_timeout_secs == 0 {
            return Err(Pdf2MdError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
