use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and optional L2 (Redis) caching.
/// L1 is fastest but local to the process; L2 is shared across instances
/// and only used when a Redis URL is configured. Generation counters live
/// in Redis when it is configured and in process memory otherwise.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    generations: Mutex<HashMap<String, u64>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by L1 and Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: build_l1(l1_size, ttl_secs),
            generations: Mutex::default(),
            ttl_secs,
        })
    }

    /// Create an L1-only cache manager
    pub fn local(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            generations: Mutex::default(),
            ttl_secs,
        }
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both tiers)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Current generation stored under `key`, zero when never bumped
    ///
    /// Read from Redis when configured so every instance agrees on it.
    pub async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<u64> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            return Ok(value.unwrap_or(0));
        }

        Ok(self.local_generations().get(key).copied().unwrap_or(0))
    }

    /// Advance the generation under `key`, orphaning entries keyed by older ones
    pub async fn bump_generation(&self, key: &str) -> Result<u64, CacheError> {
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let next: u64 = redis::cmd("INCR")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            tracing::debug!("Cache generation {} -> {}", key, next);
            return Ok(next);
        }

        let mut generations = self.local_generations();
        let next = generations.entry(key.to_string()).or_insert(0);
        *next += 1;
        tracing::debug!("Cache generation {} -> {}", key, next);
        Ok(*next)
    }

    fn local_generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Counter advanced whenever a project's match set changes
    pub fn project_generation(project_id: Uuid) -> String {
        format!("matches:{}:gen", project_id)
    }

    /// Build a cache key for one page of a project's matches at a generation
    pub fn project_matches(project_id: Uuid, generation: u64, page: u32, limit: u32) -> String {
        format!("matches:{}:g{}:{}:{}", project_id, generation, page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        let gen_key = CacheKey::project_generation(Uuid::new_v4());
        let before = cache.generation(&gen_key).await.unwrap();
        assert_eq!(cache.bump_generation(&gen_key).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn test_local_generation_bump() {
        let cache = CacheManager::local(100, 60);
        let project = CacheKey::project_generation(Uuid::new_v4());
        let other = CacheKey::project_generation(Uuid::new_v4());

        assert_eq!(cache.generation(&project).await.unwrap(), 0);
        assert_eq!(cache.bump_generation(&project).await.unwrap(), 1);
        assert_eq!(cache.bump_generation(&project).await.unwrap(), 2);

        assert_eq!(cache.generation(&project).await.unwrap(), 2);
        assert_eq!(cache.generation(&other).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_local_set_get() {
        let cache = CacheManager::local(100, 60);
        let key = CacheKey::project_matches(Uuid::nil(), 0, 1, 10);

        assert!(matches!(cache.get::<u32>(&key).await, Err(CacheError::CacheMiss(_))));
        cache.set(&key, &7u32).await.unwrap();
        assert_eq!(cache.get::<u32>(&key).await.unwrap(), 7);
    }

    #[test]
    fn test_cache_key_builder() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::project_matches(id, 3, 2, 10),
            "matches:00000000-0000-0000-0000-000000000000:g3:2:10"
        );
        assert_ne!(
            CacheKey::project_matches(id, 0, 1, 10),
            CacheKey::project_matches(id, 1, 1, 10)
        );
        assert_eq!(
            CacheKey::project_generation(id),
            "matches:00000000-0000-0000-0000-000000000000:gen"
        );
    }
}
