use super::json::JsonParser;
use super::text::TextParser;
use super::{DocumentParser, ParseError, ParsedDocument};

use std::collections::HashMap;
use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Dispatch table from file extension to parser.
///
/// Content-based sniffing runs before extension lookup: a payload that starts
/// with the PDF signature is handed to the `.pdf` parser regardless of what
/// the filename claims.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Registry with the built-in text and JSON parsers.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register(Arc::new(TextParser));
        registry.register(Arc::new(JsonParser));
        registry
    }

    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        for extension in parser.supported_extensions().iter().copied() {
            self.parsers.insert(extension, parser.clone());
            tracing::debug!("Registered parser for {}", extension);
        }
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self.parsers.keys().copied().collect();
        extensions.sort_unstable();
        extensions
    }

    /// Extracts text from `bytes`, choosing a parser by magic bytes then by
    /// the extension of `file_path`.
    pub fn parse(&self, file_path: &str, bytes: &[u8]) -> Result<ParsedDocument, ParseError> {
        if bytes.starts_with(PDF_MAGIC) {
            return match self.parsers.get(".pdf") {
                Some(parser) => parser.parse(bytes),
                None => Err(ParseError::UnsupportedType(".pdf".to_string())),
            };
        }

        let extension = extension_of(file_path);
        match extension.as_deref().and_then(|ext| self.parsers.get(ext)) {
            Some(parser) => parser.parse(bytes),
            None => Err(ParseError::UnsupportedType(
                extension.unwrap_or_else(|| file_path.to_string()),
            )),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased extension of a path, including the leading dot.
fn extension_of(file_path: &str) -> Option<String> {
    let file_name = file_path.rsplit('/').next()?;
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(file_name[dot..].to_lowercase())
}

#[cfg(test)]
mod extension_tests {
    use super::extension_of;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("owner/report.PDF"), Some(".pdf".to_string()));
        assert_eq!(extension_of("owner/notes.txt"), Some(".txt".to_string()));
        assert_eq!(extension_of("owner/archive.tar.gz"), Some(".gz".to_string()));
        assert_eq!(extension_of("owner/Makefile"), None);
        assert_eq!(extension_of("owner/.hidden"), None);
    }
}
