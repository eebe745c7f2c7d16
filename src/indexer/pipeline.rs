use crate::analysis::tokenizer::{Token, Tokenizer};
use crate::objects::ObjectStore;
use crate::parser::registry::ParserRegistry;
use crate::parser::ParsedDocument;
use crate::queue::types::IndexingJob;
use crate::store::contract::PostingStore;
use crate::store::router::ShardRouter;
use crate::store::types::{DocumentRecord, PostingEntry};

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// How a job failed, which decides its fate on the queue: transient failures
/// re-enter through the retry discipline, permanent ones dead-letter
/// immediately.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("transient failure: {0}")]
    Transient(anyhow::Error),
    #[error("permanent failure: {0}")]
    Permanent(anyhow::Error),
}

/// Per-term aggregate folded from the token stream in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermAggregate {
    pub term_frequency: u32,
    pub positions: Vec<u32>,
}

/// The single-job indexing pipeline.
pub struct IndexPipeline {
    objects: Arc<dyn ObjectStore>,
    parsers: Arc<ParserRegistry>,
    store: Arc<dyn PostingStore>,
    router: ShardRouter,
    tokenizer: Tokenizer,
    batch_size: usize,
}

impl IndexPipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        parsers: Arc<ParserRegistry>,
        store: Arc<dyn PostingStore>,
        router: ShardRouter,
        batch_size: usize,
    ) -> Self {
        Self {
            objects,
            parsers,
            store,
            router,
            tokenizer: Tokenizer::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Runs every mandatory step for one job.
    ///
    /// 1. Fetch bytes from the object store.
    /// 2. Extract text through the parser registry.
    /// 3. Tokenize.
    /// 4. Fold the token stream into per-term aggregates.
    /// 5. Write posting batches (parallel, atomic per batch).
    /// 6. Write the document record, only after every batch landed.
    /// 7. Detach the best-effort term-statistics update.
    pub async fn run(&self, job: &IndexingJob) -> Result<(), JobError> {
        let doc_id = Uuid::parse_str(&job.payload.doc_id).map_err(|e| {
            JobError::Permanent(anyhow::anyhow!(
                "invalid doc_id {:?}: {}",
                job.payload.doc_id,
                e
            ))
        })?;

        let bytes = self
            .objects
            .get(&job.payload.file_path)
            .await
            .map_err(JobError::Transient)?;

        let parsed = self
            .parsers
            .parse(&job.payload.file_path, &bytes)
            .map_err(|e| JobError::Permanent(anyhow::Error::new(e)))?;

        let tokens = self.tokenizer.tokenize(&parsed.content);
        let total_terms = tokens.len() as u64;
        tracing::debug!(
            "Job {}: extracted {} tokens from {}",
            job.job_id,
            total_terms,
            job.payload.file_path
        );

        let aggregates = aggregate_terms(&tokens);

        self.write_postings(doc_id, &aggregates).await?;

        let record = self.build_record(job, &parsed, doc_id, total_terms);
        self.store
            .write_document(record)
            .await
            .map_err(JobError::Transient)?;

        self.spawn_stats_update(job.job_id.clone(), aggregates);

        Ok(())
    }

    /// Partitions the aggregated terms by shard, chunks each shard's entries
    /// into batches of at most `batch_size`, and issues all batches
    /// concurrently. Any batch failure fails the job (transient); redelivery
    /// is safe because batch writes are last-writer-wins per `(term, doc_id)`.
    async fn write_postings(
        &self,
        doc_id: Uuid,
        aggregates: &HashMap<String, TermAggregate>,
    ) -> Result<(), JobError> {
        let mut by_shard: HashMap<u32, Vec<PostingEntry>> = HashMap::new();
        for (term, aggregate) in aggregates {
            by_shard
                .entry(self.router.shard_for(term))
                .or_default()
                .push(PostingEntry {
                    term: term.clone(),
                    term_frequency: aggregate.term_frequency,
                    positions: aggregate.positions.clone(),
                });
        }

        let mut writes = Vec::new();
        for (shard, entries) in &by_shard {
            for batch in entries.chunks(self.batch_size) {
                writes.push(self.store.write_posting_batch(*shard, doc_id, batch.to_vec()));
            }
        }

        for result in join_all(writes).await {
            result.map_err(JobError::Transient)?;
        }

        Ok(())
    }

    fn build_record(
        &self,
        job: &IndexingJob,
        parsed: &ParsedDocument,
        doc_id: Uuid,
        total_terms: u64,
    ) -> DocumentRecord {
        let title = parsed
            .metadata
            .get("title")
            .filter(|title| !title.is_empty())
            .cloned()
            .unwrap_or_else(|| job.payload.file_name.clone());
        let author = parsed
            .metadata
            .get("author")
            .filter(|author| !author.is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        DocumentRecord {
            doc_id,
            title,
            author,
            file_path: job.payload.file_path.clone(),
            owner_id: job.payload.user_id.clone(),
            total_terms,
            indexed_at: Utc::now(),
        }
    }

    /// Statistics ride a detached task: they only tune BM25's idf and stay
    /// meaningful when slightly stale, so a failure here never fails the job.
    fn spawn_stats_update(&self, job_id: String, aggregates: HashMap<String, TermAggregate>) {
        let store = self.store.clone();
        let router = self.router;

        tokio::spawn(async move {
            let mut failed = 0usize;
            for (term, aggregate) in &aggregates {
                let shard = router.shard_for(term);
                if let Err(e) = store
                    .increment_term_stats(shard, term, aggregate.term_frequency)
                    .await
                {
                    failed += 1;
                    tracing::debug!("Stats update for term {:?} failed: {}", term, e);
                }
            }

            if failed > 0 {
                tracing::warn!(
                    "Job {}: term statistics update failed for {}/{} terms",
                    job_id,
                    failed,
                    aggregates.len()
                );
            }
        });
    }
}

/// Folds a token stream into `term -> (tf, positions)` in one pass.
/// Positions stay in emission order, so their length equals the frequency.
pub fn aggregate_terms(tokens: &[Token]) -> HashMap<String, TermAggregate> {
    let mut aggregates: HashMap<String, TermAggregate> = HashMap::new();

    for token in tokens {
        aggregates
            .entry(token.word.clone())
            .and_modify(|aggregate| {
                aggregate.term_frequency += 1;
                aggregate.positions.push(token.position as u32);
            })
            .or_insert_with(|| TermAggregate {
                term_frequency: 1,
                positions: vec![token.position as u32],
            });
    }

    aggregates
}
