use redis::aio::ConnectionManager;
use redis::streams::{StreamClaimReply, StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::error::BrokerResult;

/// One message pulled from the stream.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Stream entry id of this delivery.
    pub id: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    /// How many times this message has been re-published after a failure.
    pub retry_count: u32,
}

/// Consumer-group access to the event stream.
///
/// Holds the acknowledgement, requeue and dead-letter plumbing; the dispatch
/// loop lives in [`crate::EventWorker`].
pub struct BrokerConsumer {
    conn: ConnectionManager,
    config: ConsumerConfig,
}

impl BrokerConsumer {
    pub fn new(conn: ConnectionManager, config: ConsumerConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Create the consumer group if it does not exist yet.
    ///
    /// `MKSTREAM` lets the worker start before the first publisher; the group
    /// starts at `0` so it also drains any backlog retained on the stream.
    pub async fn ensure_group(&self) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let result: Result<String, redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream,
                    group = %self.config.group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(group = %self.config.group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Messages delivered to this consumer earlier but never acknowledged
    /// (e.g. before a crash or restart).
    pub async fn read_pending(&self) -> BrokerResult<Vec<Delivery>> {
        let options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer_id)
            .count(self.config.batch_size);

        let mut conn = self.conn.clone();
        let reply: StreamReadReply = conn
            .xread_options(&[&self.config.stream], &["0"], &options)
            .await?;

        self.collect(reply).await
    }

    /// New messages, blocking up to the configured timeout when none are
    /// available.
    pub async fn read_new(&self) -> BrokerResult<Vec<Delivery>> {
        let options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer_id)
            .count(self.config.batch_size)
            .block(self.config.block_timeout_ms as usize);

        let mut conn = self.conn.clone();
        let reply: StreamReadReply = conn
            .xread_options(&[&self.config.stream], &[">"], &options)
            .await?;

        self.collect(reply).await
    }

    pub async fn ack(&self, id: &str) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .xack(&self.config.stream, &self.config.group, &[id])
            .await?;
        Ok(())
    }

    /// Put a failed message back on the stream with an incremented retry
    /// count, then acknowledge the original delivery.
    pub async fn requeue(&self, delivery: &Delivery) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let new_id: String = redis::cmd("XADD")
            .arg(&self.config.stream)
            .arg("*")
            .arg("routing_key")
            .arg(&delivery.routing_key)
            .arg("payload")
            .arg(&delivery.payload)
            .arg("retry_count")
            .arg(delivery.retry_count + 1)
            .query_async(&mut conn)
            .await?;

        self.ack(&delivery.id).await?;

        debug!(
            original_id = %delivery.id,
            new_id = %new_id,
            retry_count = delivery.retry_count + 1,
            "Requeued message"
        );
        Ok(())
    }

    /// Park a poison message on the dead-letter stream and acknowledge it.
    pub async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> BrokerResult<()> {
        let mut conn = self.conn.clone();
        let dlq_id: String = redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg("routing_key")
            .arg(&delivery.routing_key)
            .arg("payload")
            .arg(&delivery.payload)
            .arg("retry_count")
            .arg(delivery.retry_count)
            .arg("source_stream")
            .arg(&self.config.stream)
            .arg("original_id")
            .arg(&delivery.id)
            .arg("error")
            .arg(reason)
            .arg("failed_at")
            .arg(chrono::Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await?;

        self.ack(&delivery.id).await?;

        warn!(
            original_id = %delivery.id,
            dlq_id = %dlq_id,
            routing_key = %delivery.routing_key,
            reason,
            "Moved message to dead-letter stream"
        );
        Ok(())
    }

    /// Take over deliveries stuck in another consumer's pending list.
    ///
    /// A consumer that dies (or is renamed) leaves its unacknowledged
    /// deliveries owned by the dead name; nothing redelivers them on its
    /// own. `XPENDING` finds entries idle longer than the claim timeout and
    /// `XCLAIM` re-owns them under this consumer so the dispatch loop can
    /// settle them.
    pub async fn claim_abandoned(&self) -> BrokerResult<Vec<Delivery>> {
        let mut conn = self.conn.clone();

        let pending: Vec<(String, String, i64, i64)> = redis::cmd("XPENDING")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("-")
            .arg("+")
            .arg(self.config.batch_size)
            .query_async(&mut conn)
            .await?;

        let claim_ids: Vec<&str> = pending
            .iter()
            .filter(|(_, consumer, idle_ms, _)| {
                *consumer != self.config.consumer_id
                    && *idle_ms >= self.config.claim_timeout_ms as i64
            })
            .map(|(id, _, _, _)| id.as_str())
            .collect();

        if claim_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(&self.config.consumer_id)
            .arg(self.config.claim_timeout_ms);
        for id in &claim_ids {
            cmd.arg(id);
        }

        let reply: StreamClaimReply = cmd.query_async(&mut conn).await?;
        let deliveries = self.parse_entries(reply.ids).await?;
        if !deliveries.is_empty() {
            warn!(count = deliveries.len(), "Claimed abandoned deliveries");
        }
        Ok(deliveries)
    }

    /// Turn a read reply into deliveries. Entries missing our fields cannot
    /// be dispatched; they are acked right away so they do not clog the
    /// pending list.
    async fn collect(&self, reply: StreamReadReply) -> BrokerResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        for stream_key in reply.keys {
            deliveries.extend(self.parse_entries(stream_key.ids).await?);
        }
        Ok(deliveries)
    }

    async fn parse_entries(&self, entries: Vec<StreamId>) -> BrokerResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        for entry in entries {
            let routing_key: Option<String> = entry.get("routing_key");
            let payload: Option<Vec<u8>> = entry.get("payload");
            let retry_count: u32 = entry.get("retry_count").unwrap_or(0);

            match (routing_key, payload) {
                (Some(routing_key), Some(payload)) => deliveries.push(Delivery {
                    id: entry.id.clone(),
                    routing_key,
                    payload,
                    retry_count,
                }),
                _ => {
                    warn!(id = %entry.id, "Discarding stream entry with missing fields");
                    self.ack(&entry.id).await?;
                }
            }
        }
        Ok(deliveries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn consumer(stream: &str) -> BrokerConsumer {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(url).unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        BrokerConsumer::new(conn, ConsumerConfig::new(stream, "test-group"))
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_ensure_group_is_idempotent() {
        let consumer = consumer("events:test-group-idempotent").await;
        consumer.ensure_group().await.unwrap();
        consumer.ensure_group().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_publish_read_ack_cycle() {
        use crate::publisher::{EventPublisher, RedisEventPublisher};

        let stream = format!("events:test-cycle-{}", std::process::id());
        let consumer = consumer(&stream).await;
        consumer.ensure_group().await.unwrap();

        let publisher = RedisEventPublisher::new(consumer.conn.clone(), &stream);
        publisher
            .publish("task.created", br#"{"task_id":"t1"}"#)
            .await
            .unwrap();

        let batch = consumer.read_new().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].routing_key, "task.created");
        assert_eq!(batch[0].retry_count, 0);

        consumer.ack(&batch[0].id).await.unwrap();
        assert!(consumer.read_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_unacked_delivery_stays_pending() {
        use crate::publisher::{EventPublisher, RedisEventPublisher};

        let stream = format!("events:test-pending-{}", std::process::id());
        let consumer = consumer(&stream).await;
        consumer.ensure_group().await.unwrap();

        let publisher = RedisEventPublisher::new(consumer.conn.clone(), &stream);
        publisher.publish("task.created", b"{}").await.unwrap();

        // Read without acking; every subsequent pending pass must surface
        // the delivery again until it is settled.
        let batch = consumer.read_new().await.unwrap();
        assert_eq!(batch.len(), 1);

        let pending = consumer.read_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, batch[0].id);
        assert_eq!(consumer.read_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_claim_abandoned_recovers_dead_consumers_deliveries() {
        use crate::publisher::{EventPublisher, RedisEventPublisher};

        let stream = format!("events:test-claim-{}", std::process::id());
        let dead = consumer(&stream).await;
        dead.ensure_group().await.unwrap();

        let publisher = RedisEventPublisher::new(dead.conn.clone(), &stream);
        publisher.publish("task.created", b"{}").await.unwrap();

        // "dead" reads the delivery and never acks, simulating a crash.
        let batch = dead.read_new().await.unwrap();
        assert_eq!(batch.len(), 1);

        let survivor = BrokerConsumer::new(
            dead.conn.clone(),
            ConsumerConfig::new(&stream, "test-group")
                .with_consumer_id("survivor")
                .with_claim_timeout(0),
        );

        // The survivor sees nothing in its own pending list, but the claim
        // pass re-owns the dead consumer's delivery.
        assert!(survivor.read_pending().await.unwrap().is_empty());
        let claimed = survivor.claim_abandoned().await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, batch[0].id);

        survivor.ack(&claimed[0].id).await.unwrap();
        assert!(survivor.claim_abandoned().await.unwrap().is_empty());
    }
}
