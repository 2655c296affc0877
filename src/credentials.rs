//! Per-user API key storage.
//!
//! The key lives in `~/.mistral_pdf/config.json` as `{"api_key": "..."}`.
//! Set `MISTRAL_PDF_CONFIG_DIR` to use another directory. The store is
//! independent of the orchestrator: callers load the key and pass it in
//! through [`crate::ConversionConfig::api_key`] or
//! [`crate::ConversionRequest::with_api_key`].

use crate::error::Pdf2MdError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides the directory holding `config.json`.
pub const CONFIG_DIR_ENV: &str = "MISTRAL_PDF_CONFIG_DIR";

const CONFIG_DIR_NAME: &str = ".mistral_pdf";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default)]
    api_key: String,
}

/// Reads and writes the stored API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::at(default_config_path())
    }
}

impl CredentialStore {
    /// Store at the default per-user location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key, or `None` if the file is missing or holds no key.
    pub fn load(&self) -> Result<Option<String>, Pdf2MdError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };

        let stored: StoredConfig = serde_json::from_str(&raw).map_err(|e| self.error(e))?;
        let key = stored.api_key.trim();
        debug!("Loaded API key from {}", self.path.display());
        Ok((!key.is_empty()).then(|| key.to_string()))
    }

    /// Persist `api_key`, creating the directory if needed.
    pub fn save(&self, api_key: &str) -> Result<(), Pdf2MdError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Pdf2MdError::InvalidConfig("Please enter an API key".into()));
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let body = serde_json::to_string(&StoredConfig {
            api_key: api_key.to_string(),
        })
        .map_err(|e| self.error(e))?;

        // Owner-only before any byte of the key is written.
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| self.error(e))?;
        #[cfg(unix)]
        {
            // `mode` only applies on creation; tighten a file that already existed.
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.error(e))?;
        }
        file.write_all(body.as_bytes()).map_err(|e| self.error(e))?;

        debug!("Saved API key to {}", self.path.display());
        Ok(())
    }

    fn error(&self, e: impl std::fmt::Display) -> Pdf2MdError {
        Pdf2MdError::CredentialStore {
            path: self.path.clone(),
            detail: e.to_string(),
        }
    }
}

/// `$MISTRAL_PDF_CONFIG_DIR/config.json`, else `~/.mistral_pdf/config.json`.
pub fn default_config_path() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join(CONFIG_FILE_NAME);
    }

    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("config.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trips_trimmed_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("sub/config.json"));

        store.save("  sk-abc  ").unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some("sk-abc"));
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"api_key":"sk-abc"}"#);
    }

    #[test]
    fn blank_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("config.json"));
        assert!(store.save("   ").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn empty_stored_key_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": ""}"#).unwrap();
        assert_eq!(CredentialStore::at(path).load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = CredentialStore::at(&path).load().unwrap_err();
        assert!(matches!(err, Pdf2MdError::CredentialStore { .. }), "got: {err}");
    }

    #[test]
    fn default_path_ends_with_config_json() {
        assert!(default_config_path().ends_with(CONFIG_FILE_NAME));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = CredentialStore::at(&path);
        store.save("sk-abc").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        let fresh = CredentialStore::at(dir.path().join("new/config.json"));
        fresh.save("sk-def").unwrap();
        let mode = std::fs::metadata(fresh.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
