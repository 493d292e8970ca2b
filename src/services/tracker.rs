use dashmap::DashMap;
use std::sync::Arc;

use crate::{
    db::{CacheBackend, CacheKey, EventStore},
    error::{AppError, AppResult},
    models::{EventType, InteractionRecord, UserActivity},
    services::cache::RecommendationCache,
};

/// Records interactions and keeps the recommendation cache honest
pub struct EventTracker {
    store: Arc<dyn EventStore>,
    cache: Arc<RecommendationCache>,
    counters: Arc<dyn CacheBackend>,
    activity: DashMap<String, UserActivity>,
}

impl EventTracker {
    pub fn new(
        store: Arc<dyn EventStore>,
        cache: Arc<RecommendationCache>,
        counters: Arc<dyn CacheBackend>,
    ) -> Self {
        Self {
            store,
            cache,
            counters,
            activity: DashMap::new(),
        }
    }

    /// Validates and records one interaction
    ///
    /// The append and the cache invalidation run under the user's cache slot,
    /// so no read that starts after this returns can see the old entry. The
    /// invalidation only happens once the append succeeded.
    pub async fn track(
        &self,
        user_id: &str,
        item_id: &str,
        event_type: &str,
        duration_seconds: Option<i64>,
    ) -> AppResult<InteractionRecord> {
        let record = validate(user_id, item_id, event_type, duration_seconds)?;

        {
            let mut slot = self.cache.lock_user(&record.user_id).await;
            self.store.append(&record).await.map_err(|e| {
                tracing::error!(user_id = %record.user_id, error = %e, "Failed to append event");
                e
            })?;
            self.cache.invalidate_locked(&mut slot).await;
        }

        if record.event_type.is_qualifying() {
            let key = CacheKey::UserActivity(record.user_id.clone());
            if let Err(e) = self.counters.incr(&key).await {
                tracing::warn!(
                    user_id = %record.user_id,
                    error = %e,
                    "Failed to update user activity"
                );
            }
        }

        self.activity
            .entry(record.user_id.clone())
            .or_insert_with(|| UserActivity::new(record.user_id.clone()))
            .record(&record.event_type, &record.item_id, record.created_at);

        tracing::info!(
            user_id = %record.user_id,
            item_id = %record.item_id,
            event_type = %record.event_type,
            duration = ?record.duration_seconds,
            "Tracked event"
        );

        Ok(record)
    }

    /// Activity counters for a user, if any event was tracked for them
    pub fn activity(&self, user_id: &str) -> Option<UserActivity> {
        self.activity.get(user_id).map(|a| a.value().clone())
    }

    /// Value of the `user_activity:<user>` counter; unreadable counters are `None`
    pub async fn interaction_count(&self, user_id: &str) -> Option<i64> {
        let key = CacheKey::UserActivity(user_id.to_string());
        match self.counters.get(&key).await {
            Ok(value) => value.and_then(|v| v.parse().ok()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to read user activity");
                None
            }
        }
    }
}

/// Largest duration the event store column can hold
const MAX_DURATION_SECONDS: i64 = i32::MAX as i64;

fn validate(
    user_id: &str,
    item_id: &str,
    event_type: &str,
    duration_seconds: Option<i64>,
) -> AppResult<InteractionRecord> {
    let user_id = user_id.trim();
    let item_id = item_id.trim();
    let event_type = event_type.trim();

    if user_id.is_empty() || item_id.is_empty() || event_type.is_empty() {
        return Err(AppError::Validation(
            "user_id, item_id, and event_type are required".to_string(),
        ));
    }

    let duration = match duration_seconds {
        None => None,
        Some(d) if (0..=MAX_DURATION_SECONDS).contains(&d) => Some(d as u32),
        Some(d) => {
            return Err(AppError::Validation(format!(
                "duration_seconds must be between 0 and {}, got {}",
                MAX_DURATION_SECONDS, d
            )))
        }
    };

    Ok(InteractionRecord::new(
        user_id,
        item_id,
        EventType::from(event_type),
        duration,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryCacheBackend, InMemoryEventStore, MockCacheBackend, MockEventStore};
    use crate::models::{Recommendation, Strategy};
    use std::time::Duration;

    struct Harness {
        tracker: EventTracker,
        store: Arc<InMemoryEventStore>,
        cache: Arc<RecommendationCache>,
        backend: Arc<InMemoryCacheBackend>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryEventStore::new());
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = Arc::new(RecommendationCache::new(
            backend.clone(),
            Duration::from_secs(300),
        ));
        let tracker = EventTracker::new(store.clone(), cache.clone(), backend.clone());
        Harness {
            tracker,
            store,
            cache,
            backend,
        }
    }

    fn sample() -> Vec<Recommendation> {
        vec![Recommendation {
            item_id: "tech_ai_news".to_string(),
            score: 0.9,
            explanation: "Trending in your network".to_string(),
            strategy: Strategy::Trending,
        }]
    }

    #[tokio::test]
    async fn test_track_invalidates_cached_recommendations() {
        let h = harness();
        h.cache.put("alice", &sample(), Duration::from_secs(300)).await;
        assert!(h.cache.get("alice").await.is_some());

        h.tracker
            .track("alice", "science_space", "view", Some(30))
            .await
            .unwrap();

        assert_eq!(h.cache.get("alice").await, None);
        assert_eq!(h.store.len_for("alice"), 1);
    }

    #[tokio::test]
    async fn test_track_leaves_other_users_cached() {
        let h = harness();
        h.cache.put("bob", &sample(), Duration::from_secs(300)).await;

        h.tracker.track("alice", "science_space", "view", None).await.unwrap();

        assert_eq!(h.cache.get("bob").await, Some(sample()));
    }

    #[tokio::test]
    async fn test_missing_fields_fail_without_side_effects() {
        let h = harness();
        h.cache.put("alice", &sample(), Duration::from_secs(300)).await;

        for (user, item, kind) in [("", "x_1", "view"), ("alice", "", "view"), ("alice", "x_1", " ")] {
            let err = h.tracker.track(user, item, kind, None).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert_eq!(h.store.len_for("alice"), 0);
        assert_eq!(h.cache.get("alice").await, Some(sample()));
        assert!(h.tracker.activity("alice").is_none());
    }

    #[tokio::test]
    async fn test_negative_duration_is_rejected() {
        let h = harness();
        let err = h
            .tracker
            .track("alice", "tech_ai_news", "view", Some(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.store.len_for("alice"), 0);
    }

    #[tokio::test]
    async fn test_duration_upper_bound() {
        let h = harness();

        let err = h
            .tracker
            .track("alice", "tech_ai_news", "view", Some(3_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.store.len_for("alice"), 0);

        let record = h
            .tracker
            .track("alice", "tech_ai_news", "view", Some(i64::from(i32::MAX)))
            .await
            .unwrap();
        assert_eq!(record.duration_seconds, Some(i32::MAX as u32));
    }

    #[tokio::test]
    async fn test_counters_follow_event_types() {
        let h = harness();
        h.tracker.track("alice", "tech_ai_news", "view", Some(12)).await.unwrap();
        h.tracker.track("alice", "science_space", "view", None).await.unwrap();
        h.tracker.track("alice", "science_space", "click", None).await.unwrap();
        h.tracker.track("alice", "science_space", "like", None).await.unwrap();

        let activity = h.tracker.activity("alice").unwrap();
        assert_eq!(activity.page_views, 2);
        assert_eq!(activity.clicks, 1);
        assert_eq!(activity.categories, vec!["tech", "science"]);

        // "like" is stored but does not count
        assert_eq!(h.store.len_for("alice"), 4);
        assert_eq!(h.tracker.interaction_count("alice").await, Some(3));
        assert_eq!(
            h.backend
                .get(&CacheKey::UserActivity("alice".to_string()))
                .await
                .unwrap(),
            Some("3".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_event_type_recorded_verbatim() {
        let h = harness();
        let record = h.tracker.track("alice", "tech_ai_news", "share", None).await.unwrap();
        assert_eq!(record.event_type, EventType::Other("share".to_string()));
        assert_eq!(h.tracker.interaction_count("alice").await, None);
    }

    #[tokio::test]
    async fn test_failed_append_keeps_cache_entry() {
        let mut store = MockEventStore::new();
        store
            .expect_append()
            .returning(|_| Err(AppError::StoreUnavailable("disk full".to_string())));

        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = Arc::new(RecommendationCache::new(
            backend.clone(),
            Duration::from_secs(300),
        ));
        let tracker = EventTracker::new(Arc::new(store), cache.clone(), backend);
        cache.put("alice", &sample(), Duration::from_secs(300)).await;

        let err = tracker
            .track("alice", "tech_ai_news", "view", None)
            .await
            .unwrap_err();

        assert!(err.is_retriable());
        assert_eq!(cache.get("alice").await, Some(sample()));
        assert!(tracker.activity("alice").is_none());
    }

    #[tokio::test]
    async fn test_counter_failure_does_not_fail_tracking() {
        let mut counters = MockCacheBackend::new();
        counters
            .expect_incr()
            .returning(|_| Err(AppError::Internal("redis down".to_string())));

        let store = Arc::new(InMemoryEventStore::new());
        let cache = Arc::new(RecommendationCache::new(
            Arc::new(InMemoryCacheBackend::new()),
            Duration::from_secs(300),
        ));
        let tracker = EventTracker::new(store.clone(), cache, Arc::new(counters));

        tracker.track("alice", "tech_ai_news", "click", None).await.unwrap();
        assert_eq!(store.len_for("alice"), 1);
    }
}
