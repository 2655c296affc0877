//! HTTP transport for the three Mistral endpoints.
//!
//! [`OcrClient`] owns a `reqwest::Client` carrying the bearer header and the
//! request timeout, and turns every answer into either a decoded JSON value
//! or a classified [`OcrError`]:
//!
//! | Outcome                       | Error                          |
//! |-------------------------------|--------------------------------|
//! | 401                           | [`OcrError::Authentication`]   |
//! | any other non-2xx             | [`OcrError::Upstream`]         |
//! | 2xx, bad JSON / missing field | [`OcrError::InvalidResponse`]  |
//! | connect / timeout             | [`OcrError::Network`]          |
//!
//! Nothing here retries. A failure is reported upward immediately and the
//! orchestrator decides whether to fall back.

use crate::config::ConversionConfig;
use crate::error::{OcrError, Operation, Pdf2MdError};
use crate::pipeline::input::Document;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const PDF_MIME: &str = "application/pdf";

/// Identifier the service assigned to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
}

/// Time-limited URL granting the OCR job access to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
}

/// Authenticated client for the files and OCR endpoints.
#[derive(Debug, Clone)]
pub struct OcrClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OcrClient {
    /// Build a client sending `Authorization: Bearer <api_key>`.
    pub fn new(api_key: &str, config: &ConversionConfig) -> Result<Self, OcrError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(OcrError::Authentication {
                detail: "Please enter your Mistral API key".into(),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            OcrError::Authentication {
                detail: "API key contains characters not allowed in an HTTP header".into(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Pdf2MdError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /v1/files` with the document and `purpose=ocr`.
    pub async fn upload_file(&self, document: &Document) -> Result<UploadedFile, OcrError> {
        let op = Operation::Upload;
        let form = Form::new()
            .part("file", pdf_part(document)?)
            .text("purpose", "ocr");

        let response = self
            .client
            .post(self.url("/v1/files"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(op, e))?;

        let body = read_json(op, response).await?;
        let id = required_str(op, &body, "id")?;
        debug!("Uploaded '{}' as file {}", document.file_name, id);
        Ok(UploadedFile { id })
    }

    /// `GET /v1/files/{id}/url`.
    pub async fn signed_url(&self, file: &UploadedFile) -> Result<SignedUrl, OcrError> {
        let op = Operation::SignedUrl;
        let response = self
            .client
            .get(self.url(&format!("/v1/files/{}/url", file.id)))
            .send()
            .await
            .map_err(|e| network_error(op, e))?;

        let body = read_json(op, response).await?;
        let url = required_str(op, &body, "url")?;
        Ok(SignedUrl { url })
    }

    /// `POST /v1/ocr` referencing a signed URL.
    pub async fn process_document_url(&self, url: &SignedUrl) -> Result<Value, OcrError> {
        let op = Operation::Ocr;
        let payload = json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": url.url,
            }
        });

        let response = self
            .client
            .post(self.url("/v1/ocr"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| network_error(op, e))?;

        read_json(op, response).await
    }

    /// `POST /v1/ocr` with the raw document as multipart, bypassing the upload.
    pub async fn process_upload(&self, document: &Document) -> Result<Value, OcrError> {
        let op = Operation::DirectUpload;
        let form = Form::new()
            .part("file", pdf_part(document)?)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(self.url("/v1/ocr"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(op, e))?;

        read_json(op, response).await
    }
}

fn pdf_part(document: &Document) -> Result<Part, OcrError> {
    Part::stream_with_length(document.bytes.clone(), document.size())
        .file_name(document.file_name.clone())
        .mime_str(PDF_MIME)
        .map_err(|e| Pdf2MdError::Internal(format!("multipart: {e}")).into())
}

/// Check the status, then decode the body as JSON.
async fn read_json(op: Operation, response: Response) -> Result<Value, OcrError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(classify_status(op, status.as_u16(), body));
    }

    let text = response.text().await.map_err(|e| network_error(op, e))?;
    serde_json::from_str(&text).map_err(|e| OcrError::InvalidResponse {
        operation: op,
        detail: format!("body is not valid JSON ({e})"),
    })
}

/// Map a non-2xx status onto the error taxonomy.
pub(crate) fn classify_status(op: Operation, status: u16, body: String) -> OcrError {
    let body = body.trim().to_string();
    if status == 401 {
        OcrError::Authentication {
            detail: format!("Invalid API key ({op} returned 401: {body})"),
        }
    } else {
        OcrError::Upstream {
            operation: op,
            status,
            body,
        }
    }
}

fn network_error(op: Operation, e: reqwest::Error) -> OcrError {
    OcrError::Network {
        operation: op,
        timeout: e.is_timeout(),
        detail: e.to_string(),
    }
}

fn required_str(op: Operation, body: &Value, field: &str) -> Result<String, OcrError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| OcrError::InvalidResponse {
            operation: op,
            detail: format!("missing '{field}' in {body}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn blank_key_is_an_authentication_error() {
        let err = OcrClient::new("  ", &ConversionConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn key_with_newline_is_rejected() {
        let err = OcrClient::new("abc\ndef", &ConversionConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = ConversionConfig::builder()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        let client = OcrClient::new("sk-test", &config).unwrap();
        assert_eq!(client.url("/v1/ocr"), "http://localhost:8080/v1/ocr");
    }

    #[test]
    fn status_401_is_authentication() {
        let e = classify_status(Operation::Upload, 401, "Unauthorized".into());
        assert_eq!(e.kind(), ErrorKind::Authentication);
        assert!(e.to_string().contains("Unauthorized"));
    }

    #[test]
    fn other_status_is_upstream_with_body() {
        let e = classify_status(Operation::SignedUrl, 404, " not found \n".into());
        assert_eq!(e.to_string(), "File URL error: 404 - not found");
        assert_eq!(e.status(), Some(404));
    }

    #[test]
    fn missing_field_is_invalid_response() {
        let e = required_str(Operation::Upload, &json!({"object": "file"}), "id").unwrap_err();
        assert!(matches!(e, OcrError::InvalidResponse { .. }));
        assert!(e.to_string().contains("missing 'id'"));
    }

    #[test]
    fn empty_field_is_invalid_response() {
        assert!(required_str(Operation::SignedUrl, &json!({"url": ""}), "url").is_err());
        assert_eq!(
            required_str(Operation::SignedUrl, &json!({"url": "https://x"}), "url").unwrap(),
            "https://x"
        );
    }
}
