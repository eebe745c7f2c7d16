use super::types::{DocumentRecord, PostingEntry, PostingsResponse};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// The storage contract the core requires from a posting engine.
///
/// The indexer is the only writer; the coordinator only reads. Consistency:
/// within a shard, reads observe acknowledged batch writes; across shards the
/// view is eventual and readers must tolerate stale `document_frequency` and
/// missing postings for freshly indexed documents.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Applies one batch of posting entries for `doc_id` to `shard`.
    ///
    /// The batch is atomic: either every `(term, doc_id)` entry in it becomes
    /// visible or none do. Re-writing an existing `(term, doc_id)` key is
    /// last-writer-wins, which makes redelivered jobs idempotent.
    async fn write_posting_batch(
        &self,
        shard: u32,
        doc_id: Uuid,
        entries: Vec<PostingEntry>,
    ) -> Result<()>;

    /// Accumulates `document_frequency += 1, total_occurrences += tf` for a
    /// term. Best-effort: callers tolerate failures and lag.
    async fn increment_term_stats(&self, shard: u32, term: &str, term_frequency: u32)
        -> Result<()>;

    /// Upserts a document metadata record; last-writer-wins.
    async fn write_document(&self, record: DocumentRecord) -> Result<()>;

    /// Fetches candidate postings on `shard` for the given terms, truncated
    /// to `limit` rows ordered by raw term frequency descending.
    async fn get_postings(
        &self,
        shard: u32,
        terms: &[String],
        limit: usize,
    ) -> Result<PostingsResponse>;

    /// Fetches a document metadata record.
    async fn get_document(&self, doc_id: Uuid) -> Result<Option<DocumentRecord>>;
}
