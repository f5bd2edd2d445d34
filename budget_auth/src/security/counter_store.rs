//! Expiring key-value counters backing the login rate limiter.
//!
//! Production uses Redis through a [`redis::aio::ConnectionManager`];
//! [`InMemoryCounterStore`] serves tests and single-process development.

use super::errors::RateLimiterResult;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

/// Shared counter store with per-key expiry
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` and (re)set its expiry in one atomic step; returns the new value
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> RateLimiterResult<u64>;

    /// Whether `key` is present and unexpired
    async fn exists(&self, key: &str) -> RateLimiterResult<bool>;

    /// Store `value` under `key` with the given expiry
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> RateLimiterResult<()>;

    /// Remove every key in `keys`
    async fn delete(&self, keys: &[&str]) -> RateLimiterResult<()>;
}

/// Redis-backed counter store
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(redis_url: &str) -> RateLimiterResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Round-trip a PING
    pub async fn health_check(&self) -> RateLimiterResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Redis expiries have whole-second resolution; never round down to zero
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> RateLimiterResult<u64> {
        let mut conn = self.conn.clone();
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, ttl_secs(ttl) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn exists(&self, key: &str) -> RateLimiterResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> RateLimiterResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> RateLimiterResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: u64 = conn.del(keys).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory counter store; one mutex makes increment-with-expiry atomic
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key` if present and unexpired
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> RateLimiterResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let current = entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .and_then(|e| e.value.parse::<u64>().ok())
            .unwrap_or(0);
        let next = current + 1;

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(next)
    }

    async fn exists(&self, key: &str) -> RateLimiterResult<bool> {
        Ok(self.get(key).await.is_some())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> RateLimiterResult<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> RateLimiterResult<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_counts_up() {
        let store = InMemoryCounterStore::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.increment_with_expiry("k", ttl).await.unwrap(), 1);
        assert_eq!(store.increment_with_expiry("k", ttl).await.unwrap(), 2);
        assert_eq!(store.increment_with_expiry("other", ttl).await.unwrap(), 1);
        assert_eq!(store.get("k").await.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_expired_counter_restarts() {
        let store = InMemoryCounterStore::new();
        let ttl = Duration::from_millis(50);

        store.increment_with_expiry("k", ttl).await.unwrap();
        store.increment_with_expiry("k", ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.increment_with_expiry("k", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_exists_delete() {
        let store = InMemoryCounterStore::new();
        store
            .set("lock", "1", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .increment_with_expiry("count", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.exists("lock").await.unwrap());

        store.delete(&["lock", "count", "missing"]).await.unwrap();
        assert!(!store.exists("lock").await.unwrap());
        assert!(!store.exists("count").await.unwrap());
    }

    #[test]
    fn test_ttl_secs_rounds_up_to_one() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(600)), 600);
    }
}
