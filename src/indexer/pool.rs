use super::pipeline::{IndexPipeline, JobError};
use crate::config::Config;
use crate::queue::broker::{Delivery, MessageBroker, MessageHeaders};
use crate::queue::types::IndexingJob;

use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Pool tunables, split out from the node config so tests can shrink the
/// timers.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub scale_up_threshold: usize,
    pub scale_down_idle: Duration,
    pub check_interval: Duration,
    pub max_retries: u32,
    pub dispatch_capacity: usize,
}

impl From<&Config> for PoolConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            min_workers: cfg.min_workers,
            max_workers: cfg.max_workers,
            scale_up_threshold: cfg.scale_up_threshold,
            scale_down_idle: cfg.scale_down_idle,
            check_interval: cfg.check_interval,
            max_retries: cfg.max_retries,
            dispatch_capacity: cfg.dispatch_capacity,
        }
    }
}

/// Point-in-time pool gauges for the stats endpoint and reporter.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub active_workers: usize,
    pub idle_workers: usize,
    pub dispatch_queue_len: usize,
    pub total_processed: u64,
    pub total_failed: u64,
}

/// Auto-scaling indexing worker pool.
///
/// Workers compete for deliveries on a bounded dispatch channel fed by a
/// single dispatcher task. The worker count floats between `min_workers` and
/// `max_workers`: the monitor tick spawns workers against queue depth, idle
/// workers above the floor retire themselves.
pub struct WorkerPool {
    broker: Arc<dyn MessageBroker>,
    pipeline: Arc<IndexPipeline>,
    cfg: PoolConfig,

    /// Taken once by the dispatcher; dropping it closes the channel and lets
    /// workers observe shutdown.
    task_tx: parking_lot::Mutex<Option<mpsc::Sender<Delivery>>>,
    task_rx: Arc<Mutex<mpsc::Receiver<Delivery>>>,

    active: AtomicUsize,
    idle: AtomicUsize,
    queue_len: AtomicUsize,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
    next_worker_id: AtomicUsize,

    /// Serialises scale-up decisions across monitor ticks.
    scaling: Mutex<()>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        pipeline: Arc<IndexPipeline>,
        cfg: PoolConfig,
    ) -> Arc<Self> {
        let (task_tx, task_rx) = mpsc::channel(cfg.dispatch_capacity.max(1));

        Arc::new(Self {
            broker,
            pipeline,
            cfg,
            task_tx: parking_lot::Mutex::new(Some(task_tx)),
            task_rx: Arc::new(Mutex::new(task_rx)),
            active: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            queue_len: AtomicUsize::new(0),
            total_processed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            next_worker_id: AtomicUsize::new(0),
            scaling: Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active_workers: self.active.load(Ordering::SeqCst),
            idle_workers: self.idle.load(Ordering::SeqCst),
            dispatch_queue_len: self.queue_len.load(Ordering::SeqCst),
            total_processed: self.total_processed.load(Ordering::SeqCst),
            total_failed: self.total_failed.load(Ordering::SeqCst),
        }
    }

    /// Requests shutdown: the dispatcher stops, the task channel closes, and
    /// workers exit after settling the job in hand.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Begins consuming from the broker. Returns after shutdown once every
    /// worker has exited, so all in-flight deliveries are settled.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let deliveries = self.broker.consume(self.cfg.max_workers).await?;
        let task_tx = self
            .task_tx
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("pool already started"))?;

        tracing::info!(
            "Starting indexing pool (min workers: {}, max workers: {})",
            self.cfg.min_workers,
            self.cfg.max_workers
        );

        for _ in 0..self.cfg.min_workers {
            Self::spawn_worker(&self);
        }

        let scaler = {
            let pool = self.clone();
            tokio::spawn(async move { pool.scaler_loop().await })
        };
        let reporter = {
            let pool = self.clone();
            tokio::spawn(async move { pool.reporter_loop().await })
        };

        // The dispatcher runs on this task; when it returns, task_tx is gone
        // and workers start draining out.
        self.dispatch_loop(deliveries, task_tx).await;

        self.cancel.cancel();
        while self.active.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let _ = scaler.await;
        let _ = reporter.await;

        tracing::info!("Indexing pool stopped");
        Ok(())
    }

    /// Moves broker deliveries into the bounded dispatch channel. The send
    /// blocks while workers are saturated, which in turn parks the broker
    /// stream behind its prefetch window.
    async fn dispatch_loop(
        &self,
        mut deliveries: mpsc::Receiver<Delivery>,
        task_tx: mpsc::Sender<Delivery>,
    ) {
        loop {
            let delivery = tokio::select! {
                _ = self.cancel.cancelled() => break,
                maybe = deliveries.recv() => match maybe {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                sent = task_tx.send(delivery) => {
                    if sent.is_err() {
                        break;
                    }
                    self.queue_len.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    fn spawn_worker(pool: &Arc<WorkerPool>) {
        let worker_id = pool.next_worker_id.fetch_add(1, Ordering::SeqCst) + 1;
        pool.active.fetch_add(1, Ordering::SeqCst);

        let worker = pool.clone();
        tokio::spawn(async move { worker.worker_loop(worker_id).await });
    }

    async fn worker_loop(&self, worker_id: usize) {
        tracing::info!("Worker {} started", worker_id);

        loop {
            self.idle.fetch_add(1, Ordering::SeqCst);

            let received = tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.idle.fetch_sub(1, Ordering::SeqCst);
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    tracing::info!("Worker {} stopped (shutdown)", worker_id);
                    return;
                }
                received = tokio::time::timeout(self.cfg.scale_down_idle, self.next_delivery()) => received,
            };

            self.idle.fetch_sub(1, Ordering::SeqCst);

            match received {
                Ok(Some(delivery)) => {
                    self.queue_len.fetch_sub(1, Ordering::SeqCst);
                    self.process_delivery(worker_id, delivery).await;
                }
                Ok(None) => {
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    tracing::info!("Worker {} stopped (channel closed)", worker_id);
                    return;
                }
                Err(_elapsed) => {
                    // Idle too long; retire unless that would drop the pool
                    // below its floor.
                    if self.try_retire() {
                        tracing::info!("Worker {} stopped (idle timeout)", worker_id);
                        return;
                    }
                }
            }
        }
    }

    /// Decrements `active` only while it stays above `min_workers`. The
    /// compare-exchange serialises simultaneous idle timers so a retirement
    /// herd cannot sink the pool below its floor.
    fn try_retire(&self) -> bool {
        let mut current = self.active.load(Ordering::SeqCst);
        while current > self.cfg.min_workers {
            match self.active.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Receives the next delivery. Workers compete on a shared receiver; the
    /// idle timeout in the caller covers both the wait for the lock and the
    /// wait for work.
    async fn next_delivery(&self) -> Option<Delivery> {
        let mut task_rx = self.task_rx.lock().await;
        task_rx.recv().await
    }

    /// Settles one delivery. Decode failures and permanent job failures
    /// dead-letter immediately; transient failures republish with the
    /// incremented retry header until the retry budget is spent.
    async fn process_delivery(&self, worker_id: usize, delivery: Delivery) {
        let job: IndexingJob = match serde_json::from_slice(&delivery.body) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Worker {}: failed to decode job: {}", worker_id, e);
                self.total_failed.fetch_add(1, Ordering::SeqCst);
                if let Err(e) = delivery.nack_dead_letter().await {
                    tracing::warn!("Worker {}: dead-letter nack failed: {}", worker_id, e);
                }
                return;
            }
        };

        match self.pipeline.run(&job).await {
            Ok(()) => {
                tracing::debug!("Worker {}: job {} indexed", worker_id, job.job_id);
                if let Err(e) = delivery.ack().await {
                    tracing::warn!("Worker {}: failed to ack job {}: {}", worker_id, job.job_id, e);
                }
                self.total_processed.fetch_add(1, Ordering::SeqCst);
            }
            Err(JobError::Permanent(reason)) => {
                self.total_failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!(
                    "Worker {}: job {} failed permanently, dead-lettering: {}",
                    worker_id,
                    job.job_id,
                    reason
                );
                if let Err(e) = delivery.nack_dead_letter().await {
                    tracing::warn!("Worker {}: dead-letter nack failed: {}", worker_id, e);
                }
            }
            Err(JobError::Transient(reason)) => {
                self.total_failed.fetch_add(1, Ordering::SeqCst);
                self.retry_or_dead_letter(worker_id, &job, delivery, reason)
                    .await;
            }
        }
    }

    async fn retry_or_dead_letter(
        &self,
        worker_id: usize,
        job: &IndexingJob,
        delivery: Delivery,
        reason: anyhow::Error,
    ) {
        // The header, not the body, is the retry source of truth.
        let retry_count = delivery.headers.retry_count;

        if retry_count < self.cfg.max_retries {
            tracing::warn!(
                "Worker {}: retrying job {} (attempt {}/{}): {}",
                worker_id,
                job.job_id,
                retry_count + 1,
                self.cfg.max_retries,
                reason
            );

            let headers = MessageHeaders {
                retry_count: retry_count + 1,
            };
            match self.broker.publish(delivery.body.clone(), headers).await {
                // The original delivery is settled only after the republish
                // landed, so the job can never be lost in between.
                Ok(()) => {
                    if let Err(e) = delivery.ack().await {
                        tracing::warn!(
                            "Worker {}: failed to ack retried job {}: {}",
                            worker_id,
                            job.job_id,
                            e
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Worker {}: failed to republish job {}, dead-lettering: {}",
                        worker_id,
                        job.job_id,
                        e
                    );
                    if let Err(e) = delivery.nack_dead_letter().await {
                        tracing::warn!("Worker {}: dead-letter nack failed: {}", worker_id, e);
                    }
                }
            }
        } else {
            tracing::error!(
                "Worker {}: job {} failed after {} retries, dead-lettering: {}",
                worker_id,
                job.job_id,
                retry_count,
                reason
            );
            if let Err(e) = delivery.nack_dead_letter().await {
                tracing::warn!("Worker {}: dead-letter nack failed: {}", worker_id, e);
            }
        }
    }

    async fn scaler_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.cfg.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = interval.tick() => Self::evaluate_scaling(&self).await,
            }
        }
    }

    async fn evaluate_scaling(pool: &Arc<WorkerPool>) {
        let _guard = pool.scaling.lock().await;

        let active = pool.active.load(Ordering::SeqCst);
        let idle = pool.idle.load(Ordering::SeqCst);
        let queue_len = pool.queue_len.load(Ordering::SeqCst);

        if queue_len > pool.cfg.scale_up_threshold && active < pool.cfg.max_workers {
            let needed = queue_len.div_ceil(5).max(1);
            let to_spawn = needed.min(pool.cfg.max_workers - active);

            tracing::info!(
                "Scaling up: queue depth {}, spawning {} workers (active: {} -> {})",
                queue_len,
                to_spawn,
                active,
                active + to_spawn
            );

            for _ in 0..to_spawn {
                Self::spawn_worker(pool);
            }
        }

        if idle > pool.cfg.min_workers && active > pool.cfg.min_workers {
            // Scale-down is observed here but executed by the workers' own
            // idle timers.
            tracing::debug!(
                "Scale-down pressure: {} idle of {} active workers",
                idle,
                active
            );
        }
    }

    async fn reporter_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(10));

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = interval.tick() => {
                    let stats = self.stats();
                    tracing::info!(
                        "Pool stats: {} active ({} idle), queue depth {}, processed {}, failed {}",
                        stats.active_workers,
                        stats.idle_workers,
                        stats.dispatch_queue_len,
                        stats.total_processed,
                        stats.total_failed
                    );
                }
            }
        }
    }
}
