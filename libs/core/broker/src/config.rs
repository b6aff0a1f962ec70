use core_config::{env_or_default, env_parse_or, ConfigError};

pub const DEFAULT_STREAM: &str = "events:tasks";
pub const DEFAULT_GROUP: &str = "notification-workers";

/// Settings for one consumer group worker.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Stream the events are published to.
    pub stream: String,
    /// Consumer group name; one group per worker pool.
    pub group: String,
    /// Name of this consumer within the group.
    pub consumer_id: String,
    /// Stream that poison messages are parked on.
    pub dlq_stream: String,
    /// Max entries fetched per read.
    pub batch_size: usize,
    /// How long a read blocks waiting for new entries.
    pub block_timeout_ms: u64,
    /// Delivery attempts before a message is dead-lettered.
    pub max_retries: u32,
    /// How long a delivery may sit unacknowledged in another consumer's
    /// pending list before it is claimed.
    pub claim_timeout_ms: u64,
}

impl ConsumerConfig {
    pub fn new(stream: impl Into<String>, group: impl Into<String>) -> Self {
        let stream = stream.into();
        Self {
            dlq_stream: format!("{stream}:dlq"),
            stream,
            group: group.into(),
            consumer_id: default_consumer_id(),
            batch_size: 10,
            block_timeout_ms: 5000,
            max_retries: 3,
            claim_timeout_ms: 30_000,
        }
    }

    pub fn with_consumer_id(mut self, consumer_id: impl Into<String>) -> Self {
        self.consumer_id = consumer_id.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_claim_timeout(mut self, claim_timeout_ms: u64) -> Self {
        self.claim_timeout_ms = claim_timeout_ms;
        self
    }

    /// Load from environment variables, falling back to defaults:
    ///
    /// - `EVENT_STREAM` - stream name
    /// - `EVENT_GROUP` - consumer group name
    /// - `EVENT_CONSUMER_ID` - consumer name within the group
    /// - `EVENT_MAX_RETRIES` - attempts before dead-lettering
    pub fn from_env() -> Result<Self, ConfigError> {
        let stream = env_or_default("EVENT_STREAM", DEFAULT_STREAM);
        let group = env_or_default("EVENT_GROUP", DEFAULT_GROUP);
        let max_retries = env_parse_or("EVENT_MAX_RETRIES", 3)?;

        let mut config = Self::new(stream, group).with_max_retries(max_retries);
        if let Ok(consumer_id) = std::env::var("EVENT_CONSUMER_ID") {
            config = config.with_consumer_id(consumer_id);
        }
        Ok(config)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM, DEFAULT_GROUP)
    }
}

// The consumer name must survive restarts: entries in the group's pending
// list belong to a name, and a restarted process only re-reads the pending
// list of the name it joins with. Anything per-process (a pid, a random
// suffix) would orphan unacknowledged deliveries on every crash.
fn default_consumer_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}
