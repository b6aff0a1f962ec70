//! Event broker on Redis Streams.
//!
//! Writers publish domain events with a routing key; consumer groups give
//! each worker pool a durable, load-balanced view of the stream. Delivery is
//! at-least-once: messages are acknowledged only after the handler returns,
//! transient failures are re-published with a retry count, and poison
//! messages land in a dead-letter stream after a bounded number of attempts.

mod config;
mod consumer;
mod error;
mod publisher;
mod worker;

pub use config::ConsumerConfig;
pub use consumer::{BrokerConsumer, Delivery};
pub use error::{BrokerError, BrokerResult, ErrorCategory};
pub use publisher::{publish_json, EventPublisher, RedisEventPublisher};
pub use worker::{EventHandler, EventWorker};
