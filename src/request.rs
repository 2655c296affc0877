//! The per-run input: which file, which key, and how to stop.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between a caller and a running conversion.
///
/// Clones observe the same flag. The orchestrator only reads it at the
/// checkpoints between remote calls; a request already on the wire is never
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One conversion: a local file, an optional key override and a cancel flag.
///
/// Fields are private so the request cannot change once a run has started.
#[derive(Clone)]
pub struct ConversionRequest {
    path: PathBuf,
    api_key: Option<String>,
    cancel: CancellationFlag,
}

impl ConversionRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            api_key: None,
            cancel: CancellationFlag::new(),
        }
    }

    /// Use this key instead of [`crate::ConversionConfig::api_key`].
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Share an existing flag, e.g. one wired to a Cancel button.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The override if present and non-blank, else the configured key.
    pub(crate) fn resolve_api_key<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .or(fallback)
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("path", &self.path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let flag = CancellationFlag::new();
        let request = ConversionRequest::new("doc.pdf").with_cancellation(flag.clone());
        assert!(!request.is_cancelled());
        flag.cancel();
        assert!(request.is_cancelled());
    }

    #[test]
    fn override_wins_over_configured_key() {
        let request = ConversionRequest::new("doc.pdf").with_api_key("override");
        assert_eq!(request.resolve_api_key(Some("configured")), Some("override"));
    }

    #[test]
    fn blank_override_falls_back() {
        let request = ConversionRequest::new("doc.pdf").with_api_key("   ");
        assert_eq!(request.resolve_api_key(Some("configured")), Some("configured"));
        assert_eq!(request.resolve_api_key(None), None);
        assert_eq!(request.resolve_api_key(Some("")), None);
    }

    #[test]
    fn debug_redacts_key() {
        let request = ConversionRequest::new("doc.pdf").with_api_key("sk-123");
        assert!(!format!("{request:?}").contains("sk-123"));
    }
}
