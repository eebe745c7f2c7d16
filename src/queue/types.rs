use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const JOB_TYPE_DOCUMENT_INDEXING: &str = "document_indexing";

/// Durable primary queue name.
pub const QUEUE_INDEXING: &str = "indexing";
/// Dead-letter destination attached to the primary queue.
pub const QUEUE_INDEXING_DLQ: &str = "indexing_dlq";

/// One indexing job as carried on the queue (JSON body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub created_at: DateTime<Utc>,
    pub payload: JobPayload,
    /// Mirror of the retry header inside the body. The header wins on the
    /// consumer side.
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Hyphenated-hex 128-bit document id, assigned by the submitter.
    pub doc_id: String,
    pub user_id: String,
    /// Object-store key in `owner/filename` form.
    pub file_path: String,
    pub file_name: String,
    #[serde(rename = "size")]
    pub file_size: u64,
}

impl IndexingJob {
    pub fn new(doc_id: Uuid, user_id: &str, file_path: &str, file_name: &str, size: u64) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            job_type: JOB_TYPE_DOCUMENT_INDEXING.to_string(),
            created_at: Utc::now(),
            payload: JobPayload {
                doc_id: doc_id.to_string(),
                user_id: user_id.to_string(),
                file_path: file_path.to_string(),
                file_name: file_name.to_string(),
                file_size: size,
            },
            retry_count: 0,
        }
    }
}
