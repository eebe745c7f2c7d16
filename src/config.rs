//! Node Configuration
//!
//! All tunables are read from environment variables with production defaults.
//! The shard count is a deploy-time constant: changing it after data exists
//! silently breaks term routing, so it must match across every writer and
//! reader of the posting store.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Lower bound on worker tasks kept alive by the indexing pool.
    pub min_workers: usize,
    /// Upper bound on worker tasks; also used as the broker prefetch window.
    pub max_workers: usize,
    /// Internal dispatch-queue depth that triggers a scale-up decision.
    pub scale_up_threshold: usize,
    /// How long a worker may sit idle before exiting voluntarily.
    pub scale_down_idle: Duration,
    /// Interval of the auto-scaler monitoring tick.
    pub check_interval: Duration,
    /// Maximum posting entries per atomic store batch.
    pub batch_size: usize,
    /// Transient-failure redeliveries before a job is dead-lettered.
    pub max_retries: u32,
    /// Hard deadline for the per-query shard fan-out.
    pub query_deadline: Duration,
    /// Number of logical posting-store shards.
    pub shard_count: u32,
    /// BM25 term-frequency saturation parameter.
    pub k1: f64,
    /// BM25 document-length normalisation parameter.
    pub b: f64,
    /// Result count when a query does not specify one.
    pub default_top_k: usize,
    /// Capacity of the internal worker dispatch channel.
    pub dispatch_capacity: usize,
}

impl Config {
    /// Reads the environment. Durations are given as integer seconds
    /// (`SCALE_DOWN_IDLE=30`); unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            min_workers: env_parse("MIN_WORKERS", 2),
            max_workers: env_parse("MAX_WORKERS", 50),
            scale_up_threshold: env_parse("SCALE_UP_THRESHOLD", 10),
            scale_down_idle: Duration::from_secs(env_parse("SCALE_DOWN_IDLE", 30)),
            check_interval: Duration::from_secs(env_parse("CHECK_INTERVAL", 5)),
            batch_size: env_parse("BATCH_SIZE", 1000),
            max_retries: env_parse("MAX_RETRIES", 3),
            query_deadline: Duration::from_secs(env_parse("QUERY_DEADLINE", 2)),
            shard_count: env_parse("SHARD_COUNT", 3),
            k1: env_parse("K1", 1.2),
            b: env_parse("B", 0.75),
            default_top_k: env_parse("DEFAULT_TOPK", 50),
            dispatch_capacity: env_parse("DISPATCH_CAPACITY", 100),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
