#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::coordinator::bm25;
    use crate::coordinator::search::QueryCoordinator;
    use crate::coordinator::topk::{ScoredDoc, TopK};
    use crate::coordinator::types::QueryError;
    use crate::indexer::pipeline::IndexPipeline;
    use crate::objects::memory::MemoryObjectStore;
    use crate::objects::ObjectStore;
    use crate::parser::registry::ParserRegistry;
    use crate::queue::types::IndexingJob;
    use crate::store::contract::PostingStore;
    use crate::store::memory::MemoryPostingStore;
    use crate::store::router::ShardRouter;
    use crate::store::types::{DocumentRecord, PostingEntry, PostingsResponse};

    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_config() -> Config {
        Config {
            min_workers: 1,
            max_workers: 4,
            scale_up_threshold: 10,
            scale_down_idle: Duration::from_millis(200),
            check_interval: Duration::from_millis(50),
            batch_size: 1000,
            max_retries: 3,
            query_deadline: Duration::from_millis(300),
            shard_count: 3,
            k1: 1.2,
            b: 0.75,
            default_top_k: 50,
            dispatch_capacity: 100,
        }
    }

    struct Harness {
        store: Arc<MemoryPostingStore>,
        objects: Arc<MemoryObjectStore>,
        pipeline: IndexPipeline,
        coordinator: QueryCoordinator,
    }

    fn harness() -> Harness {
        let cfg = test_config();
        let router = ShardRouter::new(cfg.shard_count);
        let store = Arc::new(MemoryPostingStore::new(cfg.shard_count));
        let objects = Arc::new(MemoryObjectStore::new());

        let pipeline = IndexPipeline::new(
            objects.clone() as Arc<dyn ObjectStore>,
            Arc::new(ParserRegistry::new()),
            store.clone() as Arc<dyn PostingStore>,
            router,
            cfg.batch_size,
        );
        let coordinator = QueryCoordinator::new(
            store.clone() as Arc<dyn PostingStore>,
            objects.clone() as Arc<dyn ObjectStore>,
            router,
            &cfg,
        );

        Harness {
            store,
            objects,
            pipeline,
            coordinator,
        }
    }

    impl Harness {
        /// Indexes `text` end to end through the real pipeline.
        async fn index(&self, doc_id: Uuid, file_name: &str, text: &str) {
            let key = format!("user-1/{}", file_name);
            self.objects.put(&key, text.as_bytes().to_vec());

            let job = IndexingJob::new(doc_id, "user-1", &key, file_name, text.len() as u64);
            self.pipeline.run(&job).await.unwrap();
        }
    }

    // ============================================================
    // SCENARIO: single document round trip
    // ============================================================

    #[tokio::test]
    async fn test_single_doc_round_trip() {
        let harness = harness();
        let doc_id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();

        harness
            .index(doc_id, "systems.txt", "Running distributed systems is fun.")
            .await;

        let results = harness
            .coordinator
            .search("distributed systems", 10)
            .await
            .unwrap();

        assert!(!results.degraded);
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].doc_id, doc_id);
        assert!(results.hits[0].score > 0.0);
        assert!(results.hits[0]
            .download_url
            .as_deref()
            .unwrap()
            .contains("user-1/systems.txt"));
    }

    #[tokio::test]
    async fn test_every_indexed_token_matches() {
        let harness = harness();
        let doc_id = Uuid::new_v4();

        harness
            .index(doc_id, "langs.txt", "Running distributed systems is fun.")
            .await;

        // Analysis symmetry: querying any emitted token finds the document.
        for query in ["running", "distributed", "systems", "fun"] {
            let results = harness.coordinator.search(query, 10).await.unwrap();
            assert_eq!(results.hits.len(), 1, "query {:?} missed", query);
            assert!(results.hits[0].score > 0.0);
        }
    }

    // ============================================================
    // SCENARIO: deterministic tie-break
    // ============================================================

    #[tokio::test]
    async fn test_identical_docs_tie_break_by_doc_id() {
        let harness = harness();
        let doc_a = Uuid::parse_str("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa").unwrap();
        let doc_b = Uuid::parse_str("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb").unwrap();

        // Index b first so arrival order cannot explain the output order.
        harness.index(doc_b, "b.txt", "go rust").await;
        harness.index(doc_a, "a.txt", "go rust").await;

        let results = harness.coordinator.search("go rust", 10).await.unwrap();

        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].doc_id, doc_a);
        assert_eq!(results.hits[1].doc_id, doc_b);
        assert!((results.hits[0].score - results.hits[1].score).abs() < 1e-9);
    }

    // ============================================================
    // SCENARIO: stop-word query
    // ============================================================

    #[tokio::test]
    async fn test_stop_word_query_is_empty_not_error() {
        let harness = harness();
        harness.index(Uuid::new_v4(), "doc.txt", "go rust").await;

        let results = harness.coordinator.search("the is at", 10).await.unwrap();

        assert!(results.hits.is_empty());
        assert!(!results.degraded);
    }

    // ============================================================
    // SCENARIO: partial shard failure
    // ============================================================

    enum FailMode {
        Hang,
        Error,
    }

    /// Delegates to the in-memory engine but breaks reads on chosen shards.
    struct FailingShardStore {
        inner: Arc<MemoryPostingStore>,
        behaviors: std::collections::HashMap<u32, FailMode>,
    }

    #[async_trait]
    impl PostingStore for FailingShardStore {
        async fn write_posting_batch(
            &self,
            shard: u32,
            doc_id: Uuid,
            entries: Vec<PostingEntry>,
        ) -> Result<()> {
            self.inner.write_posting_batch(shard, doc_id, entries).await
        }

        async fn increment_term_stats(
            &self,
            shard: u32,
            term: &str,
            term_frequency: u32,
        ) -> Result<()> {
            self.inner
                .increment_term_stats(shard, term, term_frequency)
                .await
        }

        async fn write_document(&self, record: DocumentRecord) -> Result<()> {
            self.inner.write_document(record).await
        }

        async fn get_postings(
            &self,
            shard: u32,
            terms: &[String],
            limit: usize,
        ) -> Result<PostingsResponse> {
            match self.behaviors.get(&shard) {
                Some(FailMode::Hang) => tokio::time::sleep(Duration::from_secs(30)).await,
                Some(FailMode::Error) => anyhow::bail!("injected failure on shard {}", shard),
                None => {}
            }
            self.inner.get_postings(shard, terms, limit).await
        }

        async fn get_document(&self, doc_id: Uuid) -> Result<Option<DocumentRecord>> {
            self.inner.get_document(doc_id).await
        }
    }

    /// Indexes one single-term document per shard and returns a coordinator
    /// whose reads misbehave per `behaviors`.
    async fn degraded_harness(
        behaviors: std::collections::HashMap<u32, FailMode>,
    ) -> (QueryCoordinator, [Uuid; 3]) {
        let harness = harness();

        // CRC32 mod 3 pins these terms to shards 0, 1 and 2 respectively.
        let doc_go = Uuid::new_v4();
        let doc_rust = Uuid::new_v4();
        let doc_java = Uuid::new_v4();
        harness.index(doc_go, "go.txt", "go go go").await;
        harness.index(doc_rust, "rust.txt", "rust rust rust").await;
        harness.index(doc_java, "java.txt", "java java java").await;

        let cfg = test_config();
        let failing = Arc::new(FailingShardStore {
            inner: harness.store.clone(),
            behaviors,
        });
        let coordinator = QueryCoordinator::new(
            failing,
            harness.objects.clone() as Arc<dyn ObjectStore>,
            ShardRouter::new(cfg.shard_count),
            &cfg,
        );

        (coordinator, [doc_go, doc_rust, doc_java])
    }

    #[tokio::test]
    async fn test_hung_shard_degrades_result() {
        let behaviors = std::collections::HashMap::from([(1, FailMode::Hang)]);
        let (coordinator, [doc_go, doc_rust, doc_java]) = degraded_harness(behaviors).await;

        let results = coordinator.search("go rust java", 10).await.unwrap();

        assert!(results.degraded);
        let ids: Vec<Uuid> = results.hits.iter().map(|h| h.doc_id).collect();
        assert!(ids.contains(&doc_go));
        assert!(ids.contains(&doc_java));
        // "rust" lives on the hung shard; its document cannot appear.
        assert!(!ids.contains(&doc_rust));
    }

    #[tokio::test]
    async fn test_erroring_shard_degrades_result() {
        let behaviors = std::collections::HashMap::from([(2, FailMode::Error)]);
        let (coordinator, [doc_go, _, doc_java]) = degraded_harness(behaviors).await;

        let results = coordinator.search("go rust java", 10).await.unwrap();

        assert!(results.degraded);
        let ids: Vec<Uuid> = results.hits.iter().map(|h| h.doc_id).collect();
        assert!(ids.contains(&doc_go));
        assert!(!ids.contains(&doc_java));
    }

    #[tokio::test]
    async fn test_first_error_cancels_outstanding_fetches() {
        // Shard 0 fails instantly, shard 1 would hang for 30s, shard 2 is
        // healthy. The failure must abandon the hung fetch instead of letting
        // it idle out the full query deadline.
        let behaviors = std::collections::HashMap::from([
            (0, FailMode::Error),
            (1, FailMode::Hang),
        ]);
        let (coordinator, [doc_go, doc_rust, doc_java]) = degraded_harness(behaviors).await;

        let started = std::time::Instant::now();
        let results = coordinator.search("go rust java", 10).await.unwrap();

        // Well under the 300ms deadline: the cancellation fired, the timer
        // never had to.
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(results.degraded);
        let ids: Vec<Uuid> = results.hits.iter().map(|h| h.doc_id).collect();
        assert!(ids.contains(&doc_java));
        assert!(!ids.contains(&doc_go));
        assert!(!ids.contains(&doc_rust));
    }

    #[tokio::test]
    async fn test_all_shards_failing_is_unavailable() {
        let harness = harness();
        harness.index(Uuid::new_v4(), "go.txt", "go").await;

        let cfg = test_config();
        let failing = Arc::new(FailingShardStore {
            inner: harness.store.clone(),
            behaviors: std::collections::HashMap::from([(
                ShardRouter::new(cfg.shard_count).shard_for("go"),
                FailMode::Error,
            )]),
        });
        let coordinator = QueryCoordinator::new(
            failing,
            harness.objects.clone() as Arc<dyn ObjectStore>,
            ShardRouter::new(cfg.shard_count),
            &cfg,
        );

        // Single-term query: the only shard involved fails.
        let result = coordinator.search("go", 10).await;

        assert!(matches!(result, Err(QueryError::Unavailable { shards: 1 })));
    }

    // ============================================================
    // TOP-K SOUNDNESS
    // ============================================================

    #[tokio::test]
    async fn test_top_k_bounds_and_ordering() {
        let harness = harness();

        for i in 1..=6u32 {
            let text = vec!["token"; i as usize].join(" ");
            harness
                .index(Uuid::new_v4(), &format!("doc{}.txt", i), &text)
                .await;
        }

        let results = harness.coordinator.search("token", 3).await.unwrap();

        assert_eq!(results.hits.len(), 3);
        for pair in results.hits.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id)
            );
        }
    }

    #[tokio::test]
    async fn test_missing_metadata_drops_hit() {
        let harness = harness();
        let router = ShardRouter::new(3);

        // Postings exist but no document record was ever written.
        let orphan = Uuid::new_v4();
        harness
            .store
            .write_posting_batch(
                router.shard_for("ghost"),
                orphan,
                vec![PostingEntry {
                    term: "ghost".to_string(),
                    term_frequency: 1,
                    positions: vec![0],
                }],
            )
            .await
            .unwrap();

        let results = harness.coordinator.search("ghost", 10).await.unwrap();

        assert!(results.hits.is_empty());
        assert!(!results.degraded);
    }

    // ============================================================
    // BM25
    // ============================================================

    #[test]
    fn test_bm25_increasing_in_tf() {
        let mut last = 0.0;
        for tf in 1..10u32 {
            let score = bm25::score(tf, 100, 100.0, 5, 1000, 1.2, 0.75);
            assert!(score > last, "tf={} did not increase the score", tf);
            last = score;
        }
    }

    #[test]
    fn test_bm25_decreasing_in_df() {
        let mut last = f64::INFINITY;
        for df in 1..10u64 {
            let score = bm25::score(3, 100, 100.0, df, 1000, 1.2, 0.75);
            assert!(score < last, "df={} did not decrease the score", df);
            last = score;
        }
    }

    #[test]
    fn test_bm25_zero_frequencies_contribute_nothing() {
        assert_eq!(bm25::score(0, 100, 100.0, 0, 1000, 1.2, 0.75), 0.0);
        assert_eq!(bm25::score(0, 100, 100.0, 5, 1000, 1.2, 0.75), 0.0);
        assert_eq!(bm25::score(3, 100, 100.0, 0, 1000, 1.2, 0.75), 0.0);
    }

    #[test]
    fn test_bm25_length_normalisation_favors_short_docs() {
        let short = bm25::score(3, 50, 100.0, 5, 1000, 1.2, 0.75);
        let long = bm25::score(3, 200, 100.0, 5, 1000, 1.2, 0.75);

        assert!(short > long);
    }

    // ============================================================
    // TOP-K HEAP
    // ============================================================

    fn scored(id: u128, score: f64) -> ScoredDoc {
        ScoredDoc {
            doc_id: Uuid::from_u128(id),
            score,
        }
    }

    #[test]
    fn test_heap_keeps_best_k() {
        let mut top = TopK::new(2);
        top.push(scored(1, 0.5));
        top.push(scored(2, 2.0));
        top.push(scored(3, 1.0));
        top.push(scored(4, 0.1));

        let ranked = top.into_sorted();
        let scores: Vec<f64> = ranked.iter().map(|s| s.score).collect();

        assert_eq!(scores, vec![2.0, 1.0]);
    }

    #[test]
    fn test_heap_tie_break_is_order_independent() {
        let mut forward = TopK::new(1);
        forward.push(scored(1, 1.0));
        forward.push(scored(2, 1.0));

        let mut reverse = TopK::new(1);
        reverse.push(scored(2, 1.0));
        reverse.push(scored(1, 1.0));

        // Equal scores: the lower doc_id wins either way.
        assert_eq!(forward.into_sorted()[0].doc_id, Uuid::from_u128(1));
        assert_eq!(reverse.into_sorted()[0].doc_id, Uuid::from_u128(1));
    }

    #[test]
    fn test_heap_zero_capacity() {
        let mut top = TopK::new(0);
        top.push(scored(1, 1.0));

        assert!(top.is_empty());
        assert!(top.into_sorted().is_empty());
    }

    #[test]
    fn test_heap_under_capacity_returns_all_sorted() {
        let mut top = TopK::new(10);
        top.push(scored(3, 0.3));
        top.push(scored(1, 0.9));
        top.push(scored(2, 0.6));

        let ranked = top.into_sorted();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].doc_id, Uuid::from_u128(1));
        assert_eq!(ranked[2].doc_id, Uuid::from_u128(3));
    }
}
