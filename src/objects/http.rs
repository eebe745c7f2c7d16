use super::ObjectStore;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Object store backed by an HTTP gateway (e.g. an S3-compatible endpoint
/// fronted by a reverse proxy). Fetches retry transient transport failures
/// with exponential backoff and jitter before the indexing-level retry
/// discipline takes over.
pub struct HttpObjectStore {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
    attempts: usize,
}

impl HttpObjectStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            request_timeout: Duration::from_secs(30),
            attempts: 3,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    async fn get_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .client
                .get(url.clone())
                .timeout(self.request_timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(self.object_url(key)).await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "object fetch failed for {}: {}",
                key,
                response.status()
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String> {
        // Signature brokering is the gateway's job; the core only carries the
        // expiry through.
        Ok(format!(
            "{}?expires_in={}&method=PUT",
            self.object_url(key),
            ttl.as_secs()
        ))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!(
            "{}?expires_in={}",
            self.object_url(key),
            ttl.as_secs()
        ))
    }
}
