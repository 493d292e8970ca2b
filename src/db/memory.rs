//! In-process backends used when no database or Redis URL is configured,
//! and by the test suite.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheKey, EventStore, UserItemSet};
use crate::error::{AppError, AppResult};
use crate::models::{EventType, InteractionRecord};

/// Interaction index keyed by user
///
/// Each user's records live in one map entry and are only mutated under that
/// entry's lock, so readers never see a half-applied append.
#[derive(Default)]
pub struct InMemoryEventStore {
    records: DashMap<String, Vec<InteractionRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held for a user
    pub fn len_for(&self, user_id: &str) -> usize {
        self.records.get(user_id).map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, record: &InteractionRecord) -> AppResult<()> {
        self.records
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn recent_items(&self, user_id: &str, limit: usize) -> AppResult<Vec<String>> {
        let Some(records) = self.records.get(user_id) else {
            return Ok(Vec::new());
        };

        // Appends are chronological; stable sort keeps that order for equal timestamps
        let mut views: Vec<&InteractionRecord> = records
            .iter()
            .filter(|r| r.event_type == EventType::View)
            .collect();
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(views
            .into_iter()
            .rev()
            .take(limit)
            .map(|r| r.item_id.clone())
            .collect())
    }

    async fn user_item_sets(&self) -> AppResult<HashMap<String, UserItemSet>> {
        let mut sets = HashMap::with_capacity(self.records.len());

        for entry in self.records.iter() {
            let mut items = UserItemSet::new();
            for record in entry.value() {
                if !record.is_well_formed() {
                    tracing::warn!(
                        user_id = %record.user_id,
                        item_id = %record.item_id,
                        "Skipping malformed interaction record"
                    );
                    continue;
                }
                items.insert(record.item_id.clone());
            }
            if !items.is_empty() {
                sets.insert(entry.key().clone(), items);
            }
        }

        Ok(sets)
    }
}

struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local stand-in for Redis with the same TTL semantics
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, StoredValue>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let key = key.to_string();
        let now = Instant::now();

        if let Some(stored) = self.entries.get(&key) {
            if stored.is_live(now) {
                return Ok(Some(stored.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(&key, |_, stored| !stored.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> AppResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        self.entries.remove(&key.to_string());
        Ok(())
    }

    async fn incr(&self, key: &CacheKey) -> AppResult<i64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue {
                value: "0".to_string(),
                expires_at: None,
            });

        let current = if entry.is_live(now) {
            entry.value.parse::<i64>().map_err(|_| {
                AppError::Internal(format!("Counter {} holds a non-integer value", key))
            })?
        } else {
            0
        };

        let next = current + 1;
        entry.value = next.to_string();
        entry.expires_at = None;
        Ok(next)
    }
}
