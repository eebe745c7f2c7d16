//! Indexing Worker Module
//!
//! Builds the inverted index. The pool drains the durable job queue through a
//! dispatcher, hands deliveries to worker tasks over a bounded in-process
//! channel, and scales the worker count with load.
//!
//! ## Architecture
//! - **Dispatcher**: a single task that moves broker deliveries into the
//!   bounded dispatch channel. When workers saturate, the send blocks, which
//!   stops further broker deliveries; the prefetch window is the outer
//!   backpressure bound.
//! - **Workers**: each runs the single-job pipeline (fetch -> extract ->
//!   tokenize -> aggregate -> posting batches -> document record -> detached
//!   statistics) and settles every delivery exactly once: ack on success or
//!   after a retry republish, dead-letter on permanent failure or exhausted
//!   retries.
//! - **Auto-scaler**: a monitor tick spawns `min(ceil(queueLen/5), max-active)`
//!   workers when the dispatch queue backs up; a scaling mutex serialises the
//!   decision so concurrent ticks cannot over-spawn. Workers above the
//!   minimum retire themselves on an idle timer; the monitor only observes
//!   scale-down.
//! - **Shutdown**: cancellation closes the dispatch channel; workers finish
//!   the job in hand, settle it, and exit. `start` returns once every worker
//!   has exited.
//!
//! Counters (`active`, `idle`, queue depth, totals) are plain atomics; the
//! only lock on the scaling path is the decision mutex.

pub mod pipeline;
pub mod pool;
