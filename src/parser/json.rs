use super::{DocumentParser, ParseError, ParsedDocument};
use std::collections::HashMap;

/// JSON documents. Indexable text is every string value in the tree, in
/// traversal order; keys and scalars carry no retrieval signal.
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, ParseError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ParseError::Malformed {
                format: "JSON",
                reason: e.to_string(),
            })?;

        let mut content = String::new();
        extract_text(&value, &mut content);
        let content = content.trim().to_string();

        if content.is_empty() {
            return Err(ParseError::EmptyContent);
        }

        Ok(ParsedDocument {
            content,
            metadata: HashMap::from([("fileType".to_string(), "application/json".to_string())]),
        })
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }
}

fn extract_text(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        serde_json::Value::Object(map) => {
            for nested in map.values() {
                extract_text(nested, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                extract_text(item, out);
            }
        }
        _ => {}
    }
}
