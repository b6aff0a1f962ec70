use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::error::CacheResult;

/// Low-level cache operations, injected into the version registry and the
/// query cache so they can be exercised without a live Redis.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Atomically add `delta` to the counter at `key` and refresh its TTL.
    /// A missing counter is treated as 0 before the addition.
    async fn increment(&self, key: &str, delta: i64, ttl: Duration) -> CacheResult<i64>;

    /// Set `key` only if it does not exist. Returns whether the write won.
    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool>;

    /// Refresh the TTL of an existing key. A no-op for missing keys.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;
}

/// Redis-backed [`CacheStore`].
///
/// ConnectionManager reconnects on its own, so this is cheap to clone and
/// share across services.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64, ttl: Duration) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        let (value, _): (i64, i64) = redis::pipe()
            .cmd("INCRBY")
            .arg(key)
            .arg(delta)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> RedisCacheStore {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(url).unwrap();
        RedisCacheStore::new(ConnectionManager::new(client).await.unwrap())
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_set_get_roundtrip() {
        let store = connect().await;
        let key = format!("test:store:{}", std::process::id());

        store
            .set(&key, b"hello", Duration::from_secs(30))
            .await
            .unwrap();
        let value = store.get(&key).await.unwrap();
        assert_eq!(value.as_deref(), Some(b"hello".as_slice()));
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_set_if_absent_only_wins_once() {
        let store = connect().await;
        let key = format!("test:store:nx:{}", std::process::id());

        let first = store
            .set_if_absent(&key, b"1", Duration::from_secs(30))
            .await
            .unwrap();
        let second = store
            .set_if_absent(&key, b"2", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some(b"1".as_slice()));
    }
}
