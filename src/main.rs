use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use searchgrid::config::Config;
use searchgrid::coordinator::handlers::handle_search;
use searchgrid::coordinator::search::QueryCoordinator;
use searchgrid::indexer::pipeline::IndexPipeline;
use searchgrid::indexer::pool::{PoolConfig, PoolStats, WorkerPool};
use searchgrid::objects::http::HttpObjectStore;
use searchgrid::objects::memory::MemoryObjectStore;
use searchgrid::objects::{object_key, ObjectStore};
use searchgrid::parser::registry::ParserRegistry;
use searchgrid::queue::broker::{MessageBroker, MessageHeaders};
use searchgrid::queue::memory::MemoryBroker;
use searchgrid::queue::types::IndexingJob;
use searchgrid::store::contract::PostingStore;
use searchgrid::store::memory::MemoryPostingStore;
use searchgrid::store::router::ShardRouter;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use uuid::Uuid;

const UPLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cfg = Config::from_env();
    let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| "127.0.0.1:8080".parse().expect("valid default bind address"));

    tracing::info!("Starting search node on {}", bind_addr);
    tracing::info!(
        "Shards: {}, workers: {}..{}, batch size: {}",
        cfg.shard_count,
        cfg.min_workers,
        cfg.max_workers,
        cfg.batch_size
    );

    // 1. Storage layer:
    let router = ShardRouter::new(cfg.shard_count);
    let store = Arc::new(MemoryPostingStore::new(cfg.shard_count));
    let objects: Arc<dyn ObjectStore> = match std::env::var("OBJECT_STORE_URL") {
        Ok(url) => {
            tracing::info!("Using HTTP object store at {}", url);
            Arc::new(HttpObjectStore::new(&url))
        }
        Err(_) => {
            tracing::info!("Using in-memory object store");
            Arc::new(MemoryObjectStore::new())
        }
    };

    // 2. Indexing pool:
    let broker = MemoryBroker::new();
    let broker_contract: Arc<dyn MessageBroker> = Arc::new(broker.clone());
    let pipeline = Arc::new(IndexPipeline::new(
        objects.clone(),
        Arc::new(ParserRegistry::new()),
        store.clone() as Arc<dyn PostingStore>,
        router,
        cfg.batch_size,
    ));
    let pool = WorkerPool::new(
        broker_contract.clone(),
        pipeline,
        PoolConfig::from(&cfg),
    );
    let pool_runner = tokio::spawn(pool.clone().start());

    // 3. Query coordinator:
    let coordinator = Arc::new(QueryCoordinator::new(
        store.clone() as Arc<dyn PostingStore>,
        objects.clone(),
        router,
        &cfg,
    ));

    // 4. HTTP router:
    let app = Router::new()
        .route("/search", get(handle_search))
        .route("/documents", post(handle_submit_document))
        .route("/health/stats", get(handle_stats))
        .layer(Extension(coordinator))
        .layer(Extension(broker_contract))
        .layer(Extension(objects))
        .layer(Extension(pool.clone()))
        .layer(Extension(store));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // 5. Drain the pool: workers settle in-flight jobs before exiting.
    tracing::info!("Shutting down indexing pool");
    pool.shutdown();
    pool_runner.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[derive(Deserialize)]
struct SubmitDocumentRequest {
    user_id: String,
    file_name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Serialize)]
struct SubmitDocumentResponse {
    doc_id: String,
    job_id: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_for: Option<String>,
}

/// Registers a document for indexing in one action: assigns ids, brokers a
/// presigned upload URL for the object bytes, and publishes the indexing job;
/// the workers pick it up from the queue.
async fn handle_submit_document(
    Extension(broker): Extension<Arc<dyn MessageBroker>>,
    Extension(objects): Extension<Arc<dyn ObjectStore>>,
    Json(req): Json<SubmitDocumentRequest>,
) -> (StatusCode, Json<SubmitDocumentResponse>) {
    let doc_id = Uuid::new_v4();
    let key = object_key(&req.user_id, &req.file_name);
    let job = IndexingJob::new(doc_id, &req.user_id, &key, &req.file_name, req.size);
    let job_id = job.job_id.clone();

    let failure = |job_id: String, status: &str| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubmitDocumentResponse {
                doc_id: doc_id.to_string(),
                job_id,
                status: status.to_string(),
                upload_url: None,
                valid_for: None,
            }),
        )
    };

    let upload_url = match objects.presign_put(&key, UPLOAD_URL_TTL).await {
        Ok(upload_url) => upload_url,
        Err(e) => {
            tracing::error!("Failed to presign upload for {}: {}", key, e);
            return failure(job_id, "presign_failed");
        }
    };

    let body = match serde_json::to_vec(&job) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Failed to encode job {}: {}", job_id, e);
            return failure(job_id, "encode_failed");
        }
    };

    match broker.publish(body, MessageHeaders::default()).await {
        Ok(()) => {
            tracing::info!("Queued indexing job {} for doc {}", job_id, doc_id);
            (
                StatusCode::ACCEPTED,
                Json(SubmitDocumentResponse {
                    doc_id: doc_id.to_string(),
                    job_id,
                    status: "queued".to_string(),
                    upload_url: Some(upload_url),
                    valid_for: Some(format!("{} minutes", UPLOAD_URL_TTL.as_secs() / 60)),
                }),
            )
        }
        Err(e) => {
            tracing::error!("Failed to publish job {}: {}", job_id, e);
            failure(job_id, "publish_failed")
        }
    }
}

#[derive(Serialize)]
struct NodeStatsResponse {
    pool: PoolStats,
    indexed_documents: usize,
    shard_count: u32,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

async fn handle_stats(
    Extension(pool): Extension<Arc<WorkerPool>>,
    Extension(store): Extension<Arc<MemoryPostingStore>>,
) -> Json<NodeStatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        pool: pool.stats(),
        indexed_documents: store.document_count(),
        shard_count: store.shard_count(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
