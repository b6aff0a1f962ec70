use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::warn;

use crate::error::{CacheError, CacheResult};
use crate::store::CacheStore;

/// Counters live much longer than cached entries so that a quiet dimension
/// does not silently reset to 1 while readers still hold old keys.
pub const COUNTER_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A cache dimension a query depends on and a write can invalidate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Project(String),
    Status(String),
    Assignee(String),
    Global,
}

impl Dimension {
    /// Redis key of this dimension's version counter, e.g.
    /// `tasks:v:project:123` or `tasks:v:global`.
    pub fn counter_key(&self, family: &str) -> String {
        match self {
            Dimension::Project(id) => format!("{family}:v:project:{id}"),
            Dimension::Status(status) => format!("{family}:v:status:{status}"),
            Dimension::Assignee(id) => format!("{family}:v:assignee:{id}"),
            Dimension::Global => format!("{family}:v:global"),
        }
    }

    /// Prefix used when the counter value is embedded in a cache key.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Dimension::Project(_) => "pv",
            Dimension::Status(_) => "sv",
            Dimension::Assignee(_) => "av",
            Dimension::Global => "gv",
        }
    }
}

/// Manages version counters for one key family (e.g. `tasks`).
pub struct VersionRegistry<S: CacheStore> {
    store: Arc<S>,
    family: String,
    counter_ttl: Duration,
}

impl<S: CacheStore> VersionRegistry<S> {
    pub fn new(store: Arc<S>, family: impl Into<String>) -> Self {
        Self {
            store,
            family: family.into(),
            counter_ttl: COUNTER_TTL,
        }
    }

    pub fn with_counter_ttl(mut self, ttl: Duration) -> Self {
        self.counter_ttl = ttl;
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Current version of a dimension, initializing to 1 if absent.
    ///
    /// Initialization uses an atomic set-if-absent so two concurrent readers
    /// of a fresh dimension always agree on version 1. Reading also refreshes
    /// the counter's TTL.
    pub async fn get_or_init(&self, dimension: &Dimension) -> CacheResult<i64> {
        let key = dimension.counter_key(&self.family);

        if self.store.set_if_absent(&key, b"1", self.counter_ttl).await? {
            return Ok(1);
        }

        match self.store.get(&key).await? {
            Some(bytes) => {
                self.store.expire(&key, self.counter_ttl).await?;
                parse_counter(&key, &bytes)
            }
            // The counter expired between the NX attempt and the read; treat
            // the dimension as fresh.
            None => {
                self.store.set_if_absent(&key, b"1", self.counter_ttl).await?;
                Ok(1)
            }
        }
    }

    /// Bump a dimension's version, implicitly starting from 0 when the
    /// counter is absent or expired.
    pub async fn bump(&self, dimension: &Dimension) -> CacheResult<i64> {
        let key = dimension.counter_key(&self.family);
        self.store.increment(&key, 1, self.counter_ttl).await
    }

    /// Bump every affected dimension of a write, concurrently.
    ///
    /// Failures are logged and do not stop the remaining bumps; a missed bump
    /// only delays freshness until the entry TTL runs out.
    pub async fn bump_all(&self, dimensions: &[Dimension]) {
        let bumps = dimensions.iter().map(|dim| async move {
            if let Err(e) = self.bump(dim).await {
                warn!(
                    counter = %dim.counter_key(&self.family),
                    error = %e,
                    "Failed to bump version counter"
                );
            }
        });
        join_all(bumps).await;
    }
}

fn parse_counter(key: &str, bytes: &[u8]) -> CacheResult<i64> {
    String::from_utf8_lossy(bytes)
        .parse::<i64>()
        .map_err(|e| CacheError::InvalidCounter {
            key: key.to_string(),
            details: e.to_string(),
        })
}
