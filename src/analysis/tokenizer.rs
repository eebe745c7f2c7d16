use regex::Regex;
use std::collections::HashSet;

/// A single analysed token. `position` is the ordinal index of the token in
/// the emitted sequence (after filtering), not the raw character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub position: usize,
}

/// Articles, prepositions and copulas that carry no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

pub struct Tokenizer {
    non_word: Regex,
    stop_words: HashSet<&'static str>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            non_word: Regex::new(r"[^a-z0-9\s]+").unwrap(),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Runs the full analysis pipeline over `text`.
    ///
    /// Positions are assigned after stop-word and length filtering, so the
    /// first surviving token is always at position 0.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let lowered = text.to_lowercase();
        let cleaned = self.non_word.replace_all(&lowered, " ");

        let mut tokens = Vec::new();
        let mut position = 0;

        for word in cleaned.split_whitespace() {
            if word.len() < 2 || self.stop_words.contains(word) {
                continue;
            }

            tokens.push(Token {
                word: stem(word),
                position,
            });
            position += 1;
        }

        tokens
    }

    /// Analyses `text` and returns only the term sequence.
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.tokenize(text)
            .into_iter()
            .map(|token| token.word)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Suffix stemmer. Rule order is significant: the first matching rule wins,
/// and the length guards keep short words intact.
fn stem(word: &str) -> String {
    if word.ends_with("ies") && word.len() > 4 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with("es") && word.len() > 3 {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with('s') && word.len() > 2 {
        return word[..word.len() - 1].to_string();
    }
    if word.ends_with("ing") && word.len() > 5 {
        return word[..word.len() - 3].to_string();
    }
    if word.ends_with("ed") && word.len() > 4 {
        return word[..word.len() - 2].to_string();
    }

    word.to_string()
}
