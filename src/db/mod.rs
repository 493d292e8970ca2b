use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::time::Duration;

use crate::error::AppResult;
use crate::models::InteractionRecord;

pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::memory::{InMemoryCacheBackend, InMemoryEventStore};
pub use self::postgres::{create_pool, PgEventStore};
pub use self::redis::{create_redis_client, RedisCacheBackend};

/// Distinct items a user interacted with; derived, never stored
pub type UserItemSet = BTreeSet<String>;

/// Durable log of user interactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one record; the record is immutable afterwards
    async fn append(&self, record: &InteractionRecord) -> AppResult<()>;

    /// Items the user viewed, most recent first
    async fn recent_items(&self, user_id: &str, limit: usize) -> AppResult<Vec<String>>;

    /// Snapshot of every known user's item set
    ///
    /// Malformed records are skipped individually.
    async fn user_item_sets(&self) -> AppResult<HashMap<String, UserItemSet>>;
}

/// Key/value cache with TTLs and counters
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>>;

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> AppResult<()>;

    /// Deleting an absent key is not an error
    async fn delete(&self, key: &CacheKey) -> AppResult<()>;

    /// Increments a counter, creating it at zero, and returns the new value
    async fn incr(&self, key: &CacheKey) -> AppResult<i64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendations(String),
    UserActivity(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(user_id) => write!(f, "recs:{}", user_id),
            CacheKey::UserActivity(user_id) => write!(f, "user_activity:{}", user_id),
        }
    }
}
