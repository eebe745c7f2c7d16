//! Distributed Full-Text Search Core Library
//!
//! This library crate defines the core modules of the search engine.
//! It serves as the foundation for the node binary (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled subsystems:
//!
//! - **`analysis`**: Pure text analysis. One tokenizer (normalisation, stop-word
//!   filtering, suffix stemming) shared by the index build path and the query
//!   path so that queries always match built indexes.
//! - **`store`**: The sharded posting store. Defines the storage contract
//!   (posting batches, document records, term statistics), the CRC32-based
//!   shard router, and an in-memory engine used for tests and single-node runs.
//! - **`queue`**: The indexing job queue contract. Durable-queue semantics
//!   (ack, dead-letter, retry headers) behind a narrow broker trait, with an
//!   in-process implementation.
//! - **`objects`**: Object storage contract (`owner/filename` keys, presigned
//!   URLs) with HTTP and in-memory backings.
//! - **`parser`**: Format-parser registry. Dispatches document bytes to a
//!   parser by magic bytes then file extension.
//! - **`indexer`**: The auto-scaling indexing worker pool. Drains the job
//!   queue, runs the fetch -> extract -> tokenize -> write pipeline, and
//!   enforces the bounded retry / dead-letter discipline.
//! - **`coordinator`**: The distributed query coordinator. Routes query terms
//!   to shards, fans out under a deadline, ranks with BM25, and merges a
//!   deterministic global top-K.

pub mod analysis;
pub mod config;
pub mod coordinator;
pub mod indexer;
pub mod objects;
pub mod parser;
pub mod queue;
pub mod store;
