use super::{DocumentParser, ParseError, ParsedDocument};
use std::collections::HashMap;

/// Plain-text formats. Decoding is lossy on invalid UTF-8 so that documents
/// with stray bytes still index rather than dead-letter.
pub struct TextParser;

impl DocumentParser for TextParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, ParseError> {
        let content = String::from_utf8_lossy(bytes).trim().to_string();

        if content.is_empty() {
            return Err(ParseError::EmptyContent);
        }

        Ok(ParsedDocument {
            content,
            metadata: HashMap::from([("fileType".to_string(), "text/plain".to_string())]),
        })
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".txt", ".log", ".md", ".csv"]
    }
}
