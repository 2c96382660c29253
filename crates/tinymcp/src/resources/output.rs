//! Conversion of resource handler output into a `resources/read` result.

use serde_json::Value;

use crate::types::{ReadResourceResult, ResourceContent};

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceOutput {
    Text(String),
    /// Sent base64-encoded in `blob`.
    Blob(Vec<u8>),
    /// A complete result, passed through.
    Contents(ReadResourceResult),
    Json(Value),
}

impl ResourceOutput {
    /// Wrap the output as the contents of `uri`.
    pub fn into_result(self, uri: &str, mime_type: &str) -> ReadResourceResult {
        let entry = match self {
            ResourceOutput::Contents(result) => return result,
            ResourceOutput::Text(text) => ResourceContent::text(uri, text, mime_type),
            ResourceOutput::Blob(bytes) => ResourceContent::blob(uri, &bytes, mime_type),
            ResourceOutput::Json(value) => {
                if value.get("contents").is_some() {
                    match serde_json::from_value::<ReadResourceResult>(value.clone()) {
                        Ok(result) => return result,
                        Err(e) => tracing::debug!("Resource result did not decode: {e}"),
                    }
                }
                ResourceContent::text(uri, crate::tools::output::render(value), mime_type)
            }
        };
        ReadResourceResult {
            contents: vec![entry],
        }
    }
}

impl From<String> for ResourceOutput {
    fn from(text: String) -> Self {
        ResourceOutput::Text(text)
    }
}

impl From<&str> for ResourceOutput {
    fn from(text: &str) -> Self {
        ResourceOutput::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResourceOutput {
    fn from(bytes: Vec<u8>) -> Self {
        ResourceOutput::Blob(bytes)
    }
}

impl From<&[u8]> for ResourceOutput {
    fn from(bytes: &[u8]) -> Self {
        ResourceOutput::Blob(bytes.to_vec())
    }
}

impl From<ReadResourceResult> for ResourceOutput {
    fn from(result: ReadResourceResult) -> Self {
        ResourceOutput::Contents(result)
    }
}

impl From<Value> for ResourceOutput {
    fn from(value: Value) -> Self {
        ResourceOutput::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_entry() {
        let result = ResourceOutput::from("hello").into_result("mem://a", "text/plain");
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(
            wire,
            json!({ "contents": [{ "uri": "mem://a", "mimeType": "text/plain", "text": "hello" }] })
        );
    }

    #[test]
    fn test_bytes_become_base64_blob() {
        let result = ResourceOutput::from(vec![0u8, 1, 2, 255])
            .into_result("mem://bin", "application/octet-stream");
        let entry = &result.contents[0];
        assert_eq!(entry.blob.as_deref(), Some("AAEC/w=="));
        assert!(entry.text.is_none());
    }

    #[test]
    fn test_contents_shape_passes_through() {
        let raw = json!({ "contents": [{ "uri": "other://x", "text": "t" }] });
        let result = ResourceOutput::from(raw).into_result("mem://a", "text/plain");
        assert_eq!(result.contents[0].uri, "other://x");
        assert!(result.contents[0].mime_type.is_none());
    }

    #[test]
    fn test_other_values_stringified() {
        let result = ResourceOutput::from(json!({ "temp": 22 })).into_result("w://p", "application/json");
        assert_eq!(result.contents[0].text.as_deref(), Some(r#"{"temp":22}"#));
        assert_eq!(result.contents[0].mime_type.as_deref(), Some("application/json"));
    }
}
