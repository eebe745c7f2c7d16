use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Message headers that travel outside the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    /// `x-retry-count`: how many times this job has been retried. The header,
    /// not the body field, is authoritative for the retry discipline.
    pub retry_count: u32,
}

/// Settlement backend for a single delivery.
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> Result<()>;
    /// Nack without requeue; the broker routes the message to the dead-letter
    /// queue.
    async fn nack_dead_letter(&self) -> Result<()>;
}

/// One message handed to a worker. Must be settled exactly once: `ack` after
/// success (or after a successful retry republish), `nack_dead_letter` for
/// permanent failures and exhausted retries.
pub struct Delivery {
    pub body: Vec<u8>,
    pub headers: MessageHeaders,
    acker: Box<dyn Acker>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, headers: MessageHeaders, acker: Box<dyn Acker>) -> Self {
        Self {
            body,
            headers,
            acker,
        }
    }

    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn nack_dead_letter(self) -> Result<()> {
        self.acker.nack_dead_letter().await
    }
}

/// The queue contract the indexing pool consumes through.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Starts consuming from the primary queue. The returned channel is the
    /// delivery stream; its capacity is the prefetch window, so an
    /// unsettled backlog blocks further deliveries.
    async fn consume(&self, prefetch: usize) -> Result<mpsc::Receiver<Delivery>>;

    /// Publishes a persistent message to the primary queue.
    async fn publish(&self, body: Vec<u8>, headers: MessageHeaders) -> Result<()>;
}
