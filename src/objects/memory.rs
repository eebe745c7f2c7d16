use super::ObjectStore;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

/// In-memory object store for tests and single-node runs.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, bytes: Vec<u8>) {
        self.objects.insert(key.to_string(), bytes);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow::anyhow!("object not found: {}", key))
    }

    async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!("memory://{}?expires_in={}", key, ttl.as_secs()))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!("memory://{}?expires_in={}", key, ttl.as_secs()))
    }
}
