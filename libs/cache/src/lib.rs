//! Versioned query cache on top of Redis.
//!
//! List queries are cached under keys that embed version counters for every
//! dimension the query touches (project, status filter, assignee filter, or
//! the global dimension when no filter applies). Writers bump the counters of
//! the dimensions they affect, which shifts readers onto fresh keys; stale
//! entries are never deleted and simply age out via their TTL.

mod error;
mod memory;
mod query;
mod store;
mod version;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryCacheStore;
pub use query::{ListQuery, QueryCache, DEFAULT_ENTRY_TTL};
pub use store::{CacheStore, RedisCacheStore};
pub use version::{Dimension, VersionRegistry, COUNTER_TTL};
