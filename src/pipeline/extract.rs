//! Locate markdown text in an OCR response of unknown shape.
//!
//! The service has answered with at least two layouts over time: a flat
//! `{"text": "..."}` object and a `{"pages": [{"markdown": "..."}, ...]}`
//! list. Rather than fixing a schema at the transport layer, the response is
//! kept as a raw [`Value`] and resolved here into an [`Extraction`] by strict
//! precedence:
//!
//! 1. a string `text` field, returned verbatim
//! 2. a `pages` array, joining each page's `markdown` with a blank line
//! 3. a diagnostic string embedding the whole response
//!
//! Nothing in this module panics or returns an error; malformed input ends
//! up in the diagnostic branch so a failure is visible rather than silent.

use crate::output::ExtractionSource;
use serde_json::Value;

/// Separator between consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Outcome of probing a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The top-level `text` field.
    Text(String),
    /// Joined `markdown` of every page that had one. May be empty.
    Pages { markdown: String, count: usize },
    /// No usable field; the string explains why and embeds the response.
    Diagnostic(String),
}

impl Extraction {
    pub fn as_str(&self) -> &str {
        match self {
            Extraction::Text(s) | Extraction::Diagnostic(s) => s,
            Extraction::Pages { markdown, .. } => markdown,
        }
    }

    pub fn into_markdown(self) -> String {
        match self {
            Extraction::Text(s) | Extraction::Diagnostic(s) => s,
            Extraction::Pages { markdown, .. } => markdown,
        }
    }

    /// Blank output is a failure for the orchestrator, never a success.
    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    pub fn source(&self) -> ExtractionSource {
        match self {
            Extraction::Text(_) => ExtractionSource::Text,
            Extraction::Pages { .. } => ExtractionSource::Pages,
            Extraction::Diagnostic(_) => ExtractionSource::Diagnostic,
        }
    }
}

/// Extract the markdown text of `response` as a plain string.
pub fn extract(response: &Value) -> String {
    classify(response).into_markdown()
}

/// Resolve `response` into an [`Extraction`].
pub fn classify(response: &Value) -> Extraction {
    match probe(response) {
        Ok(Some(found)) => found,
        Ok(None) if is_empty_response(response) => Extraction::Diagnostic(format!(
            "No content returned from the API. Full response: {}",
            pretty(response)
        )),
        Ok(None) => Extraction::Diagnostic(format!(
            "Could not extract markdown content. Full response: {}",
            pretty(response)
        )),
        Err(e) => Extraction::Diagnostic(format!(
            "Error extracting markdown: {e}\nResponse: {}",
            pretty(response)
        )),
    }
}

fn probe(response: &Value) -> Result<Option<Extraction>, String> {
    let Some(obj) = response.as_object() else {
        return Ok(None);
    };

    if let Some(Value::String(text)) = obj.get("text") {
        return Ok(Some(Extraction::Text(text.clone())));
    }

    let Some(Value::Array(pages)) = obj.get("pages") else {
        return Ok(None);
    };

    let mut parts = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let page = page
            .as_object()
            .ok_or_else(|| format!("page {i} is {}, expected an object", type_name(page)))?;
        match page.get("markdown") {
            None | Some(Value::Null) => {}
            Some(Value::String(md)) => parts.push(md.as_str()),
            Some(other) => {
                return Err(format!(
                    "page {i} has a 'markdown' field of type {}",
                    type_name(other)
                ))
            }
        }
    }

    Ok(Some(Extraction::Pages {
        count: parts.len(),
        markdown: parts.join(PAGE_SEPARATOR),
    }))
}

fn is_empty_response(response: &Value) -> bool {
    match response {
        Value::Null => true,
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_field_wins_over_pages() {
        let response = json!({
            "text": "# Title\n\nBody",
            "pages": [{"markdown": "ignored"}]
        });
        assert_eq!(extract(&response), "# Title\n\nBody");
        assert_eq!(classify(&response).source(), ExtractionSource::Text);
    }

    #[test]
    fn pages_are_joined_with_blank_line_in_order() {
        let response = json!({
            "pages": [
                {"index": 0, "markdown": "A"},
                {"index": 1, "markdown": "B"},
                {"index": 2, "markdown": "C"}
            ]
        });
        assert_eq!(extract(&response), "A\n\nB\n\nC");
    }

    #[test]
    fn pages_without_markdown_are_skipped() {
        let response = json!({
            "pages": [{"markdown": "A"}, {"images": []}, {"markdown": null}, {"markdown": "B"}]
        });
        assert_eq!(
            classify(&response),
            Extraction::Pages {
                markdown: "A\n\nB".into(),
                count: 2
            }
        );
    }

    #[test]
    fn empty_pages_yield_blank_extraction() {
        let extraction = classify(&json!({"pages": []}));
        assert_eq!(extraction.as_str(), "");
        assert!(extraction.is_blank());
    }

    #[test]
    fn unknown_shape_embeds_serialized_response() {
        let response = json!({"model": "mistral-ocr-latest", "usage_info": {"pages_processed": 1}});
        let out = extract(&response);
        assert!(out.starts_with("Could not extract markdown content."), "got: {out}");
        let embedded = out.split_once("Full response: ").unwrap().1;
        let round_trip: Value = serde_json::from_str(embedded).unwrap();
        assert_eq!(round_trip, response);
    }

    #[test]
    fn pages_not_a_sequence_degrades_to_diagnostic() {
        let response = json!({"pages": "oops"});
        let extraction = classify(&response);
        assert_eq!(extraction.source(), ExtractionSource::Diagnostic);
        assert!(extraction.as_str().contains("\"oops\""));
    }

    #[test]
    fn non_object_page_degrades_to_diagnostic() {
        let response = json!({"pages": [{"markdown": "A"}, 42]});
        let out = extract(&response);
        assert!(out.starts_with("Error extracting markdown: page 1"), "got: {out}");
        assert!(out.contains("42"));
    }

    #[test]
    fn non_string_markdown_degrades_to_diagnostic() {
        let out = extract(&json!({"pages": [{"markdown": ["A"]}]}));
        assert!(out.contains("'markdown' field of type an array"), "got: {out}");
    }

    #[test]
    fn non_string_text_falls_through_to_pages() {
        let response = json!({"text": null, "pages": [{"markdown": "A"}]});
        assert_eq!(extract(&response), "A");
    }

    #[test]
    fn null_and_empty_object_report_no_content() {
        assert!(extract(&Value::Null).starts_with("No content returned from the API."));
        let out = extract(&json!({}));
        assert!(out.starts_with("No content returned from the API."));
        assert!(out.ends_with("{}"));
    }

    #[test]
    fn top_level_array_is_diagnostic() {
        let extraction = classify(&json!([{"markdown": "A"}]));
        assert_eq!(extraction.source(), ExtractionSource::Diagnostic);
        assert!(!extraction.is_blank());
    }
}
