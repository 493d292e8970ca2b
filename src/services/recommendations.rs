use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::Config,
    db::{EventStore, UserItemSet},
    error::{AppError, AppResult},
    models::{category_of, AlgorithmInsight, Recommendation, SimilarityScore, Strategy},
    services::{cache::RecommendationCache, similarity::SimilarityEngine},
};

const TRENDING_EXPLANATION: &str = "Trending in your network";

/// Tunables for strategy selection
#[derive(Debug, Clone, Copy)]
pub struct RecommenderSettings {
    pub default_count: usize,
    pub min_history: usize,
    pub recent_history_limit: usize,
}

impl From<&Config> for RecommenderSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_count: config.default_recommendation_count,
            min_history: config.min_history,
            recent_history_limit: config.recent_history_limit,
        }
    }
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Globally popular items served to users without enough history
#[derive(Debug, Clone)]
pub struct TrendingCatalog {
    items: Vec<(String, f64)>,
}

impl TrendingCatalog {
    /// Catalog in rank order; scores should be non-increasing
    pub fn new(items: Vec<(String, f64)>) -> Self {
        Self { items }
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|(item_id, _)| seen.insert(item_id.as_str()))
            .map(|(item_id, score)| Recommendation {
                item_id: item_id.clone(),
                score: *score,
                explanation: TRENDING_EXPLANATION.to_string(),
                strategy: Strategy::Trending,
            })
            .collect()
    }
}

impl Default for TrendingCatalog {
    fn default() -> Self {
        let ids = [
            "tech_ai_breakthroughs",
            "science_space_exploration",
            "business_market_trends",
            "health_wellness_tips",
            "entertainment_pop_culture",
            "sports_match_highlights",
            "tech_developer_tools",
            "science_climate_report",
            "business_startup_funding",
            "health_nutrition_guide",
        ];
        let items = ids
            .iter()
            .enumerate()
            .map(|(rank, id)| (id.to_string(), (90 - 5 * rank as i64) as f64 / 100.0))
            .collect();
        Self { items }
    }
}

/// Result of a recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationOutcome {
    pub recommendations: Vec<Recommendation>,
    pub strategy: Strategy,
}

/// Clamps a requested count, falling back to the default for missing or non-positive values
pub fn clamp_count(requested: Option<i64>, default_count: usize) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => default_count,
    }
}

/// Distinct categories over total items; 0 for an empty list
pub fn diversity_score(recommendations: &[Recommendation]) -> f64 {
    if recommendations.is_empty() {
        return 0.0;
    }
    let categories: HashSet<&str> = recommendations
        .iter()
        .filter_map(|r| category_of(&r.item_id))
        .collect();
    categories.len() as f64 / recommendations.len() as f64
}

/// Items surfaced by similar users that the target has not seen, best peer first
///
/// Scores carry the similarity of the peer that first surfaced the item, so the
/// list is already in descending score order. Peers are visited in the order
/// given; within one peer, items come in the item set's ascending id order
/// rather than interaction order, which keeps equal-score runs deterministic.
pub fn collaborative_candidates(
    own_items: &UserItemSet,
    similar_users: &[SimilarityScore],
    interactions: &HashMap<String, UserItemSet>,
) -> Vec<Recommendation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut recommendations = Vec::new();

    for peer in similar_users {
        let Some(peer_items) = interactions.get(&peer.similar_user) else {
            continue;
        };
        let explanation = format!(
            "User {} ({:.0}% similar) shared {} interests",
            peer.similar_user,
            peer.score * 100.0,
            peer.shared_items.len()
        );

        for item in peer_items {
            if own_items.contains(item) || !seen.insert(item.as_str()) {
                continue;
            }
            recommendations.push(Recommendation {
                item_id: item.clone(),
                score: peer.score,
                explanation: explanation.clone(),
                strategy: Strategy::Personalized,
            });
        }
    }

    recommendations
}

/// Summary sentence describing how collaborative filtering reached its result
pub fn explain(similar_users: &[SimilarityScore], recommendation_count: usize) -> String {
    if similar_users.is_empty() {
        return "Not enough data for collaborative filtering. Using trending recommendations."
            .to_string();
    }

    let mut explanation = format!("Found {} similar users. ", similar_users.len());
    for peer in similar_users.iter().take(2) {
        explanation.push_str(&format!(
            "User {} ({:.0}% similar) shared {} interests. ",
            peer.similar_user,
            peer.score * 100.0,
            peer.shared_items.len()
        ));
    }
    explanation.push_str(&format!(
        "Based on these patterns, recommending {} new items.",
        recommendation_count
    ));
    explanation
}

/// Read-through recommendation pipeline: cache, history, similarity, synthesis
pub struct Recommender {
    store: Arc<dyn EventStore>,
    cache: Arc<RecommendationCache>,
    similarity: SimilarityEngine,
    trending: TrendingCatalog,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        store: Arc<dyn EventStore>,
        cache: Arc<RecommendationCache>,
        similarity: SimilarityEngine,
        trending: TrendingCatalog,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            store,
            cache,
            similarity,
            trending,
            settings,
        }
    }

    /// Returns up to `count` recommendations for the user
    ///
    /// Cache hits are re-tagged as `cached`. A miss recomputes from the event
    /// store and repopulates the cache unless an event for the user arrived in
    /// the meantime. Only an unreachable event store fails the request.
    pub async fn get_recommendations(
        &self,
        user_id: &str,
        count: Option<i64>,
    ) -> AppResult<RecommendationOutcome> {
        let start = Instant::now();
        let count = clamp_count(count, self.settings.default_count);

        if let Some(cached) = self.cache.get(user_id).await {
            tracing::debug!(user_id = %user_id, "Cache hit");
            let recommendations = cached
                .into_iter()
                .take(count)
                .map(|rec| Recommendation {
                    strategy: Strategy::Cached,
                    ..rec
                })
                .collect();
            return Ok(RecommendationOutcome {
                recommendations,
                strategy: Strategy::Cached,
            });
        }

        tracing::debug!(user_id = %user_id, "Cache miss");

        let ticket = self.cache.ticket(user_id).await;
        let (mut recommendations, strategy) = self.synthesize(user_id).await?;

        self.cache.put_if_current(&ticket, &recommendations).await;
        recommendations.truncate(count);

        tracing::info!(
            user_id = %user_id,
            strategy = %strategy,
            count = recommendations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendations computed"
        );

        Ok(RecommendationOutcome {
            recommendations,
            strategy,
        })
    }

    /// Builds the full, untruncated list for a user and the strategy used
    pub async fn synthesize(&self, user_id: &str) -> AppResult<(Vec<Recommendation>, Strategy)> {
        let recent = self
            .store
            .recent_items(user_id, self.settings.recent_history_limit)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Event store read failed");
                match e {
                    AppError::Database(_) | AppError::StoreUnavailable(_) => e,
                    other => AppError::StoreUnavailable(other.to_string()),
                }
            })?;

        if recent.len() < self.settings.min_history {
            tracing::debug!(
                user_id = %user_id,
                recent = recent.len(),
                "Insufficient history, using trending"
            );
            return Ok((self.trending.recommendations(), Strategy::Trending));
        }

        let interactions = match self.store.user_item_sets().await {
            Ok(interactions) => interactions,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Interaction index unavailable, using trending"
                );
                return Ok((self.trending.recommendations(), Strategy::Trending));
            }
        };

        let own_items = own_item_set(user_id, &recent, &interactions);
        let similar = self
            .similarity
            .similar_to_items(user_id, &own_items, &interactions);
        let personalized = collaborative_candidates(&own_items, &similar, &interactions);

        if personalized.is_empty() {
            tracing::debug!(
                user_id = %user_id,
                similar = similar.len(),
                "No collaborative candidates, using trending"
            );
            return Ok((self.trending.recommendations(), Strategy::Trending));
        }

        Ok((personalized, Strategy::Personalized))
    }

    /// Collaborative-filtering state for a user, for introspection
    pub async fn insight(&self, user_id: &str) -> AppResult<AlgorithmInsight> {
        let interactions = self.store.user_item_sets().await?;
        let own_items = interactions.get(user_id).cloned().unwrap_or_default();

        let similar = self
            .similarity
            .similar_to_items(user_id, &own_items, &interactions);
        let candidates = collaborative_candidates(&own_items, &similar, &interactions);
        let explanation = explain(&similar, candidates.len());

        Ok(AlgorithmInsight {
            current_user: user_id.to_string(),
            items: own_items.into_iter().collect(),
            similar_users: similar,
            recommendations: candidates.into_iter().map(|r| r.item_id).collect(),
            explanation,
            similarity_threshold: self.similarity.threshold(),
            top_k: self.similarity.top_k(),
        })
    }
}

fn own_item_set(
    user_id: &str,
    recent: &[String],
    interactions: &HashMap<String, UserItemSet>,
) -> UserItemSet {
    let mut items = interactions.get(user_id).cloned().unwrap_or_default();
    items.extend(recent.iter().cloned());
    items
}
