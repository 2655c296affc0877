//! Conversion results and Markdown persistence.

use crate::error::{ConversionFailure, ErrorKind, Pdf2MdError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which remote path produced the markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Upload, signed URL, OCR job.
    Primary,
    /// Single direct multipart submission.
    Fallback,
}

/// Which part of the response the markdown came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Text,
    Pages,
    /// The response had no usable field; the markdown is an explanation
    /// embedding the raw response.
    Diagnostic,
}

/// Successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub markdown: String,
    pub route: Route,
    pub source: ExtractionSource,
    pub duration_ms: u64,
}

/// Terminal outcome of one conversion run.
#[derive(Debug)]
pub enum ConversionResult {
    Success(ConversionOutput),
    Cancelled,
    Failed(ConversionFailure),
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConversionResult::Cancelled)
    }

    /// The markdown text, if the run succeeded.
    pub fn markdown(&self) -> Option<&str> {
        match self {
            ConversionResult::Success(out) => Some(&out.markdown),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&ConversionOutput> {
        match self {
            ConversionResult::Success(out) => Some(out),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ConversionFailure> {
        match self {
            ConversionResult::Failed(f) => Some(f),
            _ => None,
        }
    }

    /// Error classification; `None` on success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionResult::Success(_) => None,
            ConversionResult::Cancelled => Some(ErrorKind::Cancelled),
            ConversionResult::Failed(f) => Some(f.kind()),
        }
    }

    /// One-line human-readable status for a status bar.
    pub fn status_line(&self) -> String {
        match self {
            ConversionResult::Success(_) => "Conversion complete!".to_string(),
            ConversionResult::Cancelled => "Conversion cancelled".to_string(),
            ConversionResult::Failed(f) => f.user_message(),
        }
    }
}

/// `report.pdf` → `report.md`, next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    if input.file_stem().is_some() {
        input.with_extension("md")
    } else {
        PathBuf::from("document.md")
    }
}

/// Write `markdown` to `path` as UTF-8.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), Pdf2MdError> {
    let write_err = |source| Pdf2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_replaces_extension() {
        assert_eq!(
            default_output_path(Path::new("/tmp/report.pdf")),
            PathBuf::from("/tmp/report.md")
        );
        assert_eq!(
            default_output_path(Path::new("scan")),
            PathBuf::from("scan.md")
        );
        assert_eq!(default_output_path(Path::new("/")), PathBuf::from("document.md"));
    }

    #[tokio::test]
    async fn write_markdown_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.md");

        write_markdown(&path, "# Hello\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Hello\n");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[test]
    fn result_accessors() {
        let ok = ConversionResult::Success(ConversionOutput {
            markdown: "A".into(),
            route: Route::Fallback,
            source: ExtractionSource::Pages,
            duration_ms: 3,
        });
        assert_eq!(ok.markdown(), Some("A"));
        assert_eq!(ok.error_kind(), None);
        assert_eq!(ConversionResult::Cancelled.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(ConversionResult::Cancelled.status_line(), "Conversion cancelled");
    }
}
