//! Format-Parser Module
//!
//! Turns raw document bytes into plain text for the tokenizer. A registry
//! dispatches to a parser by content sniffing (the `%PDF` signature takes
//! precedence) and then by filename extension.
//!
//! Plain-text and JSON parsers ship here; binary formats (PDF, DOCX) are
//! registered by their external integrations through the same trait. The
//! extracted text is transient: it feeds the tokenizer and is never persisted.
//!
//! Error taxonomy matters downstream: a parser that fails must be
//! distinguishable from a parser that found no text, and both are permanent
//! failures for the retry discipline.

pub mod json;
pub mod registry;
pub mod text;


use std::collections::HashMap;
use thiserror::Error;

/// Extraction result: the document's text plus whatever metadata the format
/// carries (title, author, ...).
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// No registered parser handles this file type.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The selected parser could not decode the bytes.
    #[error("malformed {format} input: {reason}")]
    Malformed {
        format: &'static str,
        reason: String,
    },

    /// Decoding succeeded but the document contains no text.
    #[error("no text content found")]
    EmptyContent,
}

/// One format parser. Implementations are pure byte-to-text transforms.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, ParseError>;

    /// Lowercased extensions (with leading dot) this parser claims.
    fn supported_extensions(&self) -> &'static [&'static str];
}
