//! Redis connector and utilities.
//!
//! Redis backs both the cache store (version counters, cached pages) and
//! the event broker stream, so connection management lives here.

mod config;
mod connector;
mod health;

pub use config::RedisConfig;
pub use connector::{connect, connect_from_config, connect_from_config_with_retry};
pub use health::check_health;

// Re-export redis types for convenience
pub use redis::aio::ConnectionManager;
pub use redis::{AsyncCommands, Client, RedisResult};
