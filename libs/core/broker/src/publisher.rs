use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::debug;

use crate::error::BrokerResult;

/// Publishing seam for domain services. Write paths hold a
/// `dyn EventPublisher` so tests can record published events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a raw payload under a routing key. Returns the broker-assigned
    /// message id. Failures propagate to the caller; a write whose event
    /// cannot be published is a failed write.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> BrokerResult<String>;
}

/// Serialize `event` as JSON and publish it.
pub async fn publish_json<P, T>(publisher: &P, routing_key: &str, event: &T) -> BrokerResult<String>
where
    P: EventPublisher + ?Sized,
    T: Serialize + Sync,
{
    let payload = serde_json::to_vec(event)?;
    publisher.publish(routing_key, &payload).await
}

/// Publishes events onto a Redis stream with `XADD`.
///
/// The stream is capped with `MAXLEN ~` so it cannot grow without bound if
/// consumers fall behind for a long time.
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: ConnectionManager,
    stream: String,
    max_length: usize,
}

impl RedisEventPublisher {
    pub fn new(conn: ConnectionManager, stream: impl Into<String>) -> Self {
        Self {
            conn,
            stream: stream.into(),
            max_length: 10_000,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> BrokerResult<String> {
        let mut conn = self.conn.clone();
        let id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg("routing_key")
            .arg(routing_key)
            .arg("payload")
            .arg(payload)
            .arg("retry_count")
            .arg(0)
            .query_async(&mut conn)
            .await?;

        debug!(stream = %self.stream, routing_key, message_id = %id, "Published event");
        Ok(id)
    }
}
