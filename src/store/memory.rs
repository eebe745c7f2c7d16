//! In-Memory Posting Engine
//!
//! A sharded, process-local implementation of the `PostingStore` contract.
//! Backs tests and single-node deployments; production deployments point the
//! same contract at a wide-column store.
//!
//! Layout mirrors the logical keyspaces: per-shard posting maps
//! (`term -> doc_id -> posting`), one global document map, one global term
//! statistics map. Batch atomicity is provided by a short per-shard mutex held
//! only while a batch is applied.

use super::contract::PostingStore;
use super::types::{DocumentRecord, PostingEntry, PostingsResponse, ShardPosting, TermStats};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredPosting {
    term_frequency: u32,
    positions: Vec<u32>,
}

pub struct MemoryPostingStore {
    shard_count: u32,
    /// Per shard: term -> doc_id -> posting.
    postings: Vec<DashMap<String, DashMap<Uuid, StoredPosting>>>,
    /// Per shard: distinct documents with at least one posting.
    shard_docs: Vec<DashMap<Uuid, ()>>,
    /// Per shard: serialises batch application.
    batch_locks: Vec<Mutex<()>>,
    documents: DashMap<Uuid, DocumentRecord>,
    term_stats: DashMap<String, TermStats>,
}

impl MemoryPostingStore {
    pub fn new(shard_count: u32) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shard_count,
            postings: (0..shard_count).map(|_| DashMap::new()).collect(),
            shard_docs: (0..shard_count).map(|_| DashMap::new()).collect(),
            batch_locks: (0..shard_count).map(|_| Mutex::new(())).collect(),
            documents: DashMap::new(),
            term_stats: DashMap::new(),
        }
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Current statistics record for a term, if any update has landed.
    pub fn term_stats(&self, term: &str) -> Option<TermStats> {
        self.term_stats.get(term).map(|entry| entry.value().clone())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn check_shard(&self, shard: u32) -> Result<usize> {
        if shard >= self.shard_count {
            anyhow::bail!(
                "shard {} out of range (shard count {})",
                shard,
                self.shard_count
            );
        }
        Ok(shard as usize)
    }

    /// Document length reported with a posting. Falls back to the positions
    /// length when the document record has not landed yet (the record is
    /// written after the posting batches).
    fn doc_length(&self, doc_id: &Uuid, posting: &StoredPosting) -> u64 {
        self.documents
            .get(doc_id)
            .map(|record| record.total_terms)
            .unwrap_or(posting.positions.len() as u64)
    }
}

#[async_trait]
impl PostingStore for MemoryPostingStore {
    async fn write_posting_batch(
        &self,
        shard: u32,
        doc_id: Uuid,
        entries: Vec<PostingEntry>,
    ) -> Result<()> {
        let idx = self.check_shard(shard)?;

        let _guard = self.batch_locks[idx].lock();
        for entry in entries {
            self.postings[idx]
                .entry(entry.term)
                .or_insert_with(DashMap::new)
                .insert(
                    doc_id,
                    StoredPosting {
                        term_frequency: entry.term_frequency,
                        positions: entry.positions,
                    },
                );
        }
        self.shard_docs[idx].insert(doc_id, ());

        Ok(())
    }

    async fn increment_term_stats(
        &self,
        shard: u32,
        term: &str,
        term_frequency: u32,
    ) -> Result<()> {
        self.check_shard(shard)?;

        let mut stats = self.term_stats.entry(term.to_string()).or_default();
        stats.document_frequency += 1;
        stats.total_occurrences += term_frequency as u64;

        Ok(())
    }

    async fn write_document(&self, record: DocumentRecord) -> Result<()> {
        self.documents.insert(record.doc_id, record);
        Ok(())
    }

    async fn get_postings(
        &self,
        shard: u32,
        terms: &[String],
        limit: usize,
    ) -> Result<PostingsResponse> {
        let idx = self.check_shard(shard)?;

        let mut results = Vec::new();
        for term in terms {
            let Some(term_map) = self.postings[idx].get(term) else {
                continue;
            };

            // Exact per-shard document frequency from the live posting list.
            let document_frequency = term_map.len() as u64;

            for entry in term_map.iter() {
                let posting = entry.value();
                results.push(ShardPosting {
                    doc_id: *entry.key(),
                    term_frequency: posting.term_frequency,
                    doc_length: self.doc_length(entry.key(), posting),
                    document_frequency,
                });
            }
        }

        // tf-descending pre-filter; doc_id as secondary key keeps truncation
        // deterministic.
        results.sort_by(|a, b| {
            b.term_frequency
                .cmp(&a.term_frequency)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        results.truncate(limit);

        Ok(PostingsResponse {
            shard_id: shard,
            results,
            total_docs_in_shard: self.shard_docs[idx].len() as u64,
        })
    }

    async fn get_document(&self, doc_id: Uuid) -> Result<Option<DocumentRecord>> {
        Ok(self.documents.get(&doc_id).map(|entry| entry.value().clone()))
    }
}
