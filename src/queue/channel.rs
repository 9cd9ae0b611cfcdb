use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::MessageQueue;
use crate::models::upload::UploadMessage;

/// In-process queue backed by a tokio channel. Only useful when the API and
/// the worker share a process.
pub struct ChannelQueue {
    tx: Mutex<Option<UnboundedSender<String>>>,
    rx: Mutex<UnboundedReceiver<String>>,
}

impl ChannelQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Push a raw payload, bypassing serialization.
    pub async fn push_raw(&self, payload: &str) -> anyhow::Result<()> {
        let tx = self.tx.lock().await;
        let tx = tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Queue is closed"))?;
        tx.send(payload.to_string())
            .map_err(|_| anyhow::anyhow!("Queue receiver dropped"))
    }

    /// Stop accepting messages; `next_message` drains what is left, then returns `None`.
    pub async fn close(&self) {
        self.tx.lock().await.take();
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for ChannelQueue {
    async fn publish(&self, message: &UploadMessage) -> anyhow::Result<()> {
        let payload = serde_json::to_string(message)?;
        self.push_raw(&payload).await
    }

    async fn next_message(&self) -> anyhow::Result<Option<String>> {
        Ok(self.rx.lock().await.recv().await)
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}
