//! In-Process Broker
//!
//! A single-process implementation of the `MessageBroker` contract with a
//! primary queue and an attached dead-letter queue. Used by tests and
//! single-node runs; a durable AMQP broker backs production through the same
//! contract.

use super::broker::{Acker, Delivery, MessageBroker, MessageHeaders};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
struct Message {
    body: Vec<u8>,
    headers: MessageHeaders,
}

struct BrokerInner {
    queue_tx: mpsc::UnboundedSender<Message>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    dead_letters: Mutex<Vec<Message>>,
    acked: AtomicU64,
}

#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        tracing::debug!(
            "Declared queue {} with dead-letter routing to {}",
            super::types::QUEUE_INDEXING,
            super::types::QUEUE_INDEXING_DLQ
        );
        Self {
            inner: Arc::new(BrokerInner {
                queue_tx,
                queue_rx: Mutex::new(Some(queue_rx)),
                dead_letters: Mutex::new(Vec::new()),
                acked: AtomicU64::new(0),
            }),
        }
    }

    pub fn acked_count(&self) -> u64 {
        self.inner.acked.load(Ordering::SeqCst)
    }

    pub fn dead_letter_count(&self) -> usize {
        self.inner.dead_letters.lock().len()
    }

    /// Bodies currently parked on the dead-letter queue, oldest first.
    pub fn dead_letter_bodies(&self) -> Vec<Vec<u8>> {
        self.inner
            .dead_letters
            .lock()
            .iter()
            .map(|message| message.body.clone())
            .collect()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryAcker {
    inner: Arc<BrokerInner>,
    message: Message,
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(&self) -> Result<()> {
        self.inner.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack_dead_letter(&self) -> Result<()> {
        self.inner.dead_letters.lock().push(self.message.clone());
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn consume(&self, prefetch: usize) -> Result<mpsc::Receiver<Delivery>> {
        let mut queue_rx = self
            .inner
            .queue_rx
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("consumer already registered"))?;

        let (delivery_tx, delivery_rx) = mpsc::channel(prefetch.max(1));
        let inner = self.inner.clone();

        tokio::spawn(async move {
            while let Some(message) = queue_rx.recv().await {
                let delivery = Delivery::new(
                    message.body.clone(),
                    message.headers,
                    Box::new(MemoryAcker {
                        inner: inner.clone(),
                        message,
                    }),
                );

                // The consumer dropped its end; stop pumping. A durable
                // broker would redeliver the unsettled message on reconnect.
                if delivery_tx.send(delivery).await.is_err() {
                    break;
                }
            }
        });

        Ok(delivery_rx)
    }

    async fn publish(&self, body: Vec<u8>, headers: MessageHeaders) -> Result<()> {
        self.inner
            .queue_tx
            .send(Message { body, headers })
            .map_err(|_| anyhow::anyhow!("broker queue closed"))
    }
}
