use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::MessageQueue;
use crate::models::upload::UploadMessage;

/// Seconds a single BRPOP blocks before polling again.
const POLL_TIMEOUT_SECS: f64 = 5.0;

/// Redis list used as a FIFO work queue (LPUSH to publish, BRPOP to consume).
pub struct RedisQueue {
    queue_name: String,
    publisher: MultiplexedConnection,
    consumer: Mutex<MultiplexedConnection>,
}

impl RedisQueue {
    pub async fn new(url: &str, queue_name: &str) -> anyhow::Result<Self> {
        let client = ::redis::Client::open(url)?;
        let publisher = client.get_multiplexed_async_connection().await?;
        // BRPOP holds the connection, so the consumer gets its own with a
        // response timeout longer than the poll interval.
        let consumer = client
            .get_multiplexed_async_connection_with_timeouts(
                Duration::from_secs_f64(POLL_TIMEOUT_SECS + 5.0),
                Duration::from_secs(10),
            )
            .await?;

        info!("Connected to Redis queue '{queue_name}'");
        Ok(Self {
            queue_name: queue_name.to_string(),
            publisher,
            consumer: Mutex::new(consumer),
        })
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn publish(&self, message: &UploadMessage) -> anyhow::Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.publisher.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, &payload).await?;
        debug!("Published to '{}': {payload}", self.queue_name);
        Ok(())
    }

    async fn next_message(&self) -> anyhow::Result<Option<String>> {
        let mut guard = self.consumer.lock().await;
        let conn = &mut *guard;
        loop {
            let popped: Option<(String, String)> =
                conn.brpop(&self.queue_name, POLL_TIMEOUT_SECS).await?;
            if let Some((_, payload)) = popped {
                return Ok(Some(payload));
            }
        }
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}
