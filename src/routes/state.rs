use std::sync::Arc;

use crate::config::Config;
use crate::db::{CacheBackend, EventStore, InMemoryCacheBackend, InMemoryEventStore};
use crate::services::{
    EventTracker, RecommendationCache, Recommender, RecommenderSettings, SimilarityEngine,
    TrendingCatalog,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub tracker: Arc<EventTracker>,
}

impl AppState {
    /// Wires the recommendation core onto the given backends
    ///
    /// The recommender and the tracker share one cache so that tracking an
    /// event invalidates exactly the entry the recommender reads.
    pub fn new(
        store: Arc<dyn EventStore>,
        backend: Arc<dyn CacheBackend>,
        config: &Config,
    ) -> Self {
        let cache = Arc::new(RecommendationCache::new(backend.clone(), config.cache_ttl()));

        let recommender = Recommender::new(
            store.clone(),
            cache.clone(),
            SimilarityEngine::new(config.similarity_threshold, config.similar_users_top_k),
            TrendingCatalog::default(),
            RecommenderSettings::from(config),
        );
        let tracker = EventTracker::new(store, cache, backend);

        Self {
            recommender: Arc::new(recommender),
            tracker: Arc::new(tracker),
        }
    }

    /// State backed entirely by in-process stores
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryCacheBackend::new()),
            config,
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(&Config::default())
    }
}
