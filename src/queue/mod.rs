pub mod channel;
pub mod redis;

use async_trait::async_trait;

use crate::models::upload::UploadMessage;

/// Work queue carrying upload events from the API to the worker.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish one upload event.
    async fn publish(&self, message: &UploadMessage) -> anyhow::Result<()>;

    /// Wait for the next raw payload. `None` means the queue is closed.
    async fn next_message(&self) -> anyhow::Result<Option<String>>;

    /// Return the provider name for logging.
    fn provider_name(&self) -> &str;
}
