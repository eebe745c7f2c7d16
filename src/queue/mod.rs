//! Indexing Queue Module
//!
//! The durable message queue is an external collaborator; this module owns the
//! narrow contract the core speaks to it and the wire shape of indexing jobs.
//!
//! ## Semantics
//! - **Delivery**: at-least-once. Consumers must be idempotent (posting batch
//!   writes are last-writer-wins for identical keys, so redelivery is benign).
//! - **Retry header**: `x-retry-count` travels in message headers and is the
//!   consumer-side source of truth, independent of the body's counter.
//! - **Dead-letter**: a nack without requeue routes the message to the
//!   attached dead-letter queue for operator inspection.
//! - **Prefetch**: the consume window is bounded; together with the worker
//!   pool's bounded dispatch channel it forms the backpressure chain.
//!
//! `MemoryBroker` provides these semantics in-process for tests and
//! single-node runs.

pub mod broker;
pub mod memory;
pub mod types;
