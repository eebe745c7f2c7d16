//! Object Storage Module
//!
//! Documents live in a flat-namespace object store keyed by `owner/filename`.
//! The store itself is an external collaborator; this module holds the narrow
//! contract the core uses (direct byte fetch for the indexing workers and
//! presigned URL brokering for upload/download), plus an HTTP backing with
//! the retry/backoff discipline and an in-memory backing for tests.
//!
//! Workers always fetch object bytes directly; document content never streams
//! through another process.

pub mod http;
pub mod memory;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Narrow object-store contract.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the full byte payload stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Brokered upload URL valid for `ttl`.
    async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String>;

    /// Brokered download URL valid for `ttl`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String>;
}

/// Builds the canonical `owner/filename` object key.
pub fn object_key(owner_id: &str, file_name: &str) -> String {
    format!("{}/{}", owner_id, file_name)
}
