use super::bm25;
use super::topk::{ScoredDoc, TopK};
use super::types::{QueryError, SearchHit, SearchResults};
use crate::analysis::tokenizer::Tokenizer;
use crate::config::Config;
use crate::objects::ObjectStore;
use crate::store::contract::PostingStore;
use crate::store::router::ShardRouter;
use crate::store::types::PostingsResponse;

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Executes queries against the sharded posting store.
pub struct QueryCoordinator {
    store: Arc<dyn PostingStore>,
    objects: Arc<dyn ObjectStore>,
    router: ShardRouter,
    tokenizer: Tokenizer,
    deadline: Duration,
    k1: f64,
    b: f64,
    default_top_k: usize,
}

impl QueryCoordinator {
    pub fn new(
        store: Arc<dyn PostingStore>,
        objects: Arc<dyn ObjectStore>,
        router: ShardRouter,
        cfg: &Config,
    ) -> Self {
        Self {
            store,
            objects,
            router,
            tokenizer: Tokenizer::new(),
            deadline: cfg.query_deadline,
            k1: cfg.k1,
            b: cfg.b,
            default_top_k: cfg.default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Runs one query and returns at most `top_k` hits, ordered by strictly
    /// decreasing score with ties broken by ascending doc_id.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchResults, QueryError> {
        let terms = dedupe_preserving_order(self.tokenizer.terms(query));
        if terms.is_empty() {
            return Ok(SearchResults::empty());
        }

        let mut by_shard: HashMap<u32, Vec<String>> = HashMap::new();
        for term in terms {
            by_shard
                .entry(self.router.shard_for(&term))
                .or_default()
                .push(term);
        }

        let shard_total = by_shard.len();
        let responses = self.fan_out(by_shard, top_k).await;
        if responses.is_empty() {
            return Err(QueryError::Unavailable {
                shards: shard_total,
            });
        }
        let degraded = responses.len() < shard_total;
        if degraded {
            tracing::warn!(
                "Query degraded: {}/{} shards answered",
                responses.len(),
                shard_total
            );
        }

        let ranked = self.rank(&responses, top_k);
        let hits = self.enrich(ranked).await;

        Ok(SearchResults { hits, degraded })
    }

    /// One concurrent fetch per shard under a shared deadline. The first
    /// fatal error or deadline breach cancels every fetch still in flight;
    /// responses already gathered make up the (possibly partial) view the
    /// query is ranked on.
    async fn fan_out(
        &self,
        by_shard: HashMap<u32, Vec<String>>,
        top_k: usize,
    ) -> Vec<PostingsResponse> {
        // 2*K per shard keeps transfer bounded while leaving re-rank margin.
        let limit = (2 * top_k).max(1);
        let deadline = tokio::time::Instant::now() + self.deadline;
        let query_deadline = self.deadline;
        let cancel = CancellationToken::new();

        let fetches = by_shard.into_iter().map(|(shard, terms)| {
            let store = self.store.clone();
            let cancel = cancel.clone();
            async move {
                let fetch =
                    tokio::time::timeout_at(deadline, store.get_postings(shard, &terms, limit));

                // Biased so a fetch that is already complete is never thrown
                // away by a sibling's failure racing in.
                tokio::select! {
                    biased;
                    outcome = fetch => match outcome {
                        Ok(Ok(response)) => Some(response),
                        Ok(Err(e)) => {
                            tracing::warn!("Shard {} posting fetch failed: {}", shard, e);
                            cancel.cancel();
                            None
                        }
                        Err(_elapsed) => {
                            tracing::warn!(
                                "Shard {} posting fetch exceeded deadline {:?}",
                                shard,
                                query_deadline
                            );
                            cancel.cancel();
                            None
                        }
                    },
                    _ = cancel.cancelled() => {
                        tracing::warn!(
                            "Shard {} posting fetch abandoned after sibling failure",
                            shard
                        );
                        None
                    }
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// BM25 over every returned posting, summed per document, merged through
    /// the bounded heap.
    fn rank(&self, responses: &[PostingsResponse], top_k: usize) -> Vec<ScoredDoc> {
        let total_docs: u64 = responses.iter().map(|r| r.total_docs_in_shard).sum();

        let mut posting_count = 0usize;
        let mut length_sum = 0f64;
        for response in responses {
            for posting in &response.results {
                posting_count += 1;
                length_sum += posting.doc_length as f64;
            }
        }
        // Query-local average length, clamped away from zero.
        let avg_doc_len = if posting_count > 0 && length_sum > 0.0 {
            length_sum / posting_count as f64
        } else {
            1.0
        };

        let mut doc_scores: HashMap<Uuid, f64> = HashMap::new();
        for response in responses {
            for posting in &response.results {
                let contribution = bm25::score(
                    posting.term_frequency,
                    posting.doc_length,
                    avg_doc_len,
                    posting.document_frequency,
                    total_docs,
                    self.k1,
                    self.b,
                );
                *doc_scores.entry(posting.doc_id).or_insert(0.0) += contribution;
            }
        }

        let mut top = TopK::new(top_k);
        for (doc_id, score) in doc_scores {
            top.push(ScoredDoc { doc_id, score });
        }
        top.into_sorted()
    }

    /// Hydrates ranked doc ids with metadata. Fetches run concurrently and
    /// keep rank order; a hit whose record cannot be fetched is dropped with
    /// a warning.
    async fn enrich(&self, ranked: Vec<ScoredDoc>) -> Vec<SearchHit> {
        let fetches = ranked.into_iter().map(|scored| async move {
            match self.store.get_document(scored.doc_id).await {
                Ok(Some(record)) => {
                    let download_url = match self
                        .objects
                        .presign_get(&record.file_path, DOWNLOAD_URL_TTL)
                        .await
                    {
                        Ok(url) => Some(url),
                        Err(e) => {
                            tracing::warn!(
                                "Failed to presign download URL for {}: {}",
                                record.file_path,
                                e
                            );
                            None
                        }
                    };

                    Some(SearchHit {
                        doc_id: scored.doc_id,
                        score: scored.score,
                        title: record.title,
                        author: record.author,
                        download_url,
                    })
                }
                Ok(None) => {
                    tracing::warn!("Dropping hit {}: document record not found", scored.doc_id);
                    None
                }
                Err(e) => {
                    tracing::warn!("Dropping hit {}: metadata fetch failed: {}", scored.doc_id, e);
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }
}

fn dedupe_preserving_order(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}
