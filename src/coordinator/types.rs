use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One ranked, enriched search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: Uuid,
    pub score: f64,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Outcome of a query. `degraded` is true when ranking used a proper subset
/// of the shards because of partial failure within the deadline.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub degraded: bool,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            degraded: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    /// Every shard involved in the query failed within the deadline.
    #[error("query unavailable: all {shards} shards failed")]
    Unavailable { shards: usize },
}
