use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        error!(error = %e, "redis command failed");
        CacheError::Unavailable(e.to_string())
    }
}

/// Key/value store with a per-entry time to live.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Stores `value` under `key`, replacing any previous entry and its expiry.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    /// Removes `key`. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Redis-backed cache. Values are stored as JSON text and expire server side.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis rejects a zero expiry; a zero TTL means the entry is already gone.
        let millis = ttl.as_millis() as u64;
        if millis == 0 {
            return self.delete(key).await;
        }
        redis::cmd("SET")
            .arg(key)
            .arg(value.to_string())
            .arg("PX")
            .arg(millis)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(key, ttl_ms = millis, "cache set");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        raw.map(|s| {
            serde_json::from_str(&s)
                .map_err(|e| CacheError::Unavailable(format!("corrupt value at {key}: {e}")))
        })
        .transpose()
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let n: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(n > 0)
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryCache;
