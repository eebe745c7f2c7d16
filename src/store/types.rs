use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One posting entry, uniquely keyed by `(term, doc_id)` within a shard.
///
/// `positions` holds the ordinal token positions of the term inside the
/// document; its length always equals `term_frequency`. Positions are stored
/// to keep the write shape ready for phrase scoring but no query path reads
/// them today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingEntry {
    pub term: String,
    pub term_frequency: u32,
    pub positions: Vec<u32>,
}

/// Metadata record for an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: Uuid,
    pub title: String,
    pub author: String,
    /// Object-store key of the source bytes, in `owner/filename` form.
    pub file_path: String,
    pub owner_id: String,
    /// Token count of the document after filtering; the BM25 document length.
    pub total_terms: u64,
    pub indexed_at: DateTime<Utc>,
}

/// Global statistics for a single term, accumulated best-effort across all
/// indexed documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermStats {
    /// Distinct documents containing the term.
    pub document_frequency: u64,
    /// Sum of the term's frequency across all documents.
    pub total_occurrences: u64,
}

/// One candidate row returned by a shard for a query term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardPosting {
    pub doc_id: Uuid,
    pub term_frequency: u32,
    pub doc_length: u64,
    pub document_frequency: u64,
}

/// Everything a shard reports for one `get_postings` call.
///
/// `results` may be truncated to the request limit, ordered by raw term
/// frequency descending; the coordinator re-ranks globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingsResponse {
    pub shard_id: u32,
    pub results: Vec<ShardPosting>,
    pub total_docs_in_shard: u64,
}
