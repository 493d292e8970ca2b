use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::{CacheBackend, CacheKey};
use crate::error::AppResult;

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Cache backend storing JSON payloads and counters in Redis
///
/// Writes are awaited rather than queued so that an invalidation issued after
/// a write is guaranteed to land after it.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connects to Redis and verifies the connection with a PING
    pub async fn connect(redis_client: Client) -> AppResult<Self> {
        let mut conn = ConnectionManager::new(redis_client).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await.map_err(|e| {
            tracing::warn!(error = %e, key = %key, "Redis get failed");
            e
        })?;
        Ok(cached)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let ttl_ms = (ttl.as_millis() as u64).max(1);
        let _: () = conn
            .pset_ex(key.to_string(), value, ttl_ms)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, key = %key, "Redis set failed");
                e
            })?;

        tracing::debug!(key = %key, ttl_ms, "Cached value");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }

    async fn incr(&self, key: &CacheKey) -> AppResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key.to_string(), 1i64).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_backend() -> RedisCacheBackend {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        RedisCacheBackend::connect(client).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_cache_miss() {
        let backend = create_test_backend().await;

        let key = CacheKey::Recommendations("nonexistent_user_12345".to_string());
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_get_delete() {
        let backend = create_test_backend().await;
        let key = CacheKey::Recommendations(format!("redis_test_{}", uuid::Uuid::new_v4()));

        backend
            .set(&key, "[]".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), Some("[]".to_string()));

        backend.delete(&key).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_expires_after_ttl() {
        let backend = create_test_backend().await;
        let key = CacheKey::Recommendations(format!("redis_ttl_{}", uuid::Uuid::new_v4()));

        backend
            .set(&key, "[]".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(backend.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_incr_user_activity() {
        let backend = create_test_backend().await;
        let key = CacheKey::UserActivity(format!("redis_incr_{}", uuid::Uuid::new_v4()));

        assert_eq!(backend.incr(&key).await.unwrap(), 1);
        assert_eq!(backend.incr(&key).await.unwrap(), 2);

        backend.delete(&key).await.unwrap();
    }
}
