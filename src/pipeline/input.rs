//! Input resolution: validate a user-supplied path and load the document.
//!
//! Both remote paths need the raw bytes (the primary path uploads them, the
//! fallback posts them directly), so the file is read exactly once up front.
//! A missing or unreadable file is a local problem and never reaches the
//! network.

use crate::error::Pdf2MdError;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name sent to the service when the path has no usable file name.
const DEFAULT_FILE_NAME: &str = "document.pdf";

/// A local document ready to be sent.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    /// Base name of `path`, used as the multipart filename.
    pub file_name: String,
    /// File contents. Clones share one buffer.
    pub bytes: Bytes,
}

impl Document {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn has_pdf_magic(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

/// Load the file at `path`, validating that it is a readable regular file.
pub async fn load_document(path: &Path) -> Result<Document, Pdf2MdError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2MdError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Pdf2MdError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    if !metadata.is_file() {
        return Err(Pdf2MdError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2MdError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Pdf2MdError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Pdf2MdError::Internal(format!("reading '{}': {e}", path.display())),
    })?;

    let document = Document {
        path: path.to_path_buf(),
        file_name: file_name_of(path),
        bytes: Bytes::from(bytes),
    };

    if !document.has_pdf_magic() {
        warn!(
            "'{}' does not start with %PDF; sending it anyway",
            path.display()
        );
    }
    debug!(
        "Loaded '{}' ({} bytes)",
        document.file_name,
        document.size()
    );

    Ok(document)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_existing_file() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.7\nbody").unwrap();

        let doc = load_document(tmp.path()).await.unwrap();
        assert_eq!(doc.size(), 13);
        assert!(doc.has_pdf_magic());
        assert!(doc.file_name.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn cloned_document_shares_its_buffer() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.7\nshared").unwrap();

        let doc = load_document(tmp.path()).await.unwrap();
        let copy = doc.clone();
        assert_eq!(copy.bytes.as_ptr(), doc.bytes.as_ptr());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load_document(Path::new("/definitely/not/a/real/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2MdError::FileNotFound { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn directory_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path()).await.unwrap_err();
        assert!(matches!(err, Pdf2MdError::InvalidInput { .. }), "got: {err}");
    }

    #[test]
    fn file_name_falls_back_for_bare_root() {
        assert_eq!(file_name_of(Path::new("/")), DEFAULT_FILE_NAME);
        assert_eq!(file_name_of(Path::new("/tmp/report.pdf")), "report.pdf");
    }
}
