//! Sharded Posting Store Module
//!
//! The logical storage layer of the search engine. Three keyspaces live here:
//! posting lists (`term -> [(doc_id, term_frequency, positions)]`), document
//! metadata (`doc_id -> record`) and global term statistics
//! (`term -> (document_frequency, total_occurrences)`).
//!
//! ## Core Concepts
//! - **Partitioning**: posting lists are partitioned by term hash. The
//!   `ShardRouter` maps `CRC32(term) mod N` identically on the write path
//!   (indexer) and the read path (coordinator); N is a deploy-time constant.
//! - **Contract**: `PostingStore` is the narrow interface the core needs from
//!   a storage engine. Batch writes are atomic per batch; term statistics are
//!   best-effort accumulation; reads within a shard observe acknowledged
//!   writes, cross-shard consistency is eventual.
//! - **Engine**: `MemoryPostingStore` is the in-process engine used by tests
//!   and single-node deployments. A wide-column store backs production
//!   deployments through the same contract.

pub mod contract;
pub mod memory;
pub mod router;
pub mod types;
