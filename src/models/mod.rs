use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, time::Duration};

mod activity;
mod interaction;

pub use activity::UserActivity;
pub use interaction::{category_of, EventType, InteractionRecord};

/// Strategy that produced a recommendation list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Non-personalized popularity ranking used for cold start
    Trending,
    /// Collaborative filtering over similar users
    Personalized,
    /// Served from the recommendation cache
    Cached,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Trending => write!(f, "trending"),
            Strategy::Personalized => write!(f, "personalized"),
            Strategy::Cached => write!(f, "cached"),
        }
    }
}

/// A scored item returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub item_id: String,
    pub score: f64,
    pub explanation: String,
    pub strategy: Strategy,
}

/// Jaccard affinity between a user and one of their peers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityScore {
    pub user: String,
    pub similar_user: String,
    pub score: f64,
    /// Items both users interacted with, ascending
    pub shared_items: Vec<String>,
}

/// Cached recommendation list with the metadata needed to enforce its TTL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub recommendations: Vec<Recommendation>,
    pub inserted_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn new(recommendations: Vec<Recommendation>, ttl: Duration) -> Self {
        Self {
            recommendations,
            inserted_at: Utc::now(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// An entry is expired once its age exceeds the TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.inserted_at).num_milliseconds();
        age_ms < 0 || age_ms as u64 > self.ttl_ms
    }
}

/// Collaborative-filtering introspection for a single user
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmInsight {
    pub current_user: String,
    pub items: Vec<String>,
    pub similar_users: Vec<SimilarityScore>,
    pub recommendations: Vec<String>,
    pub explanation: String,
    pub similarity_threshold: f64,
    pub top_k: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Strategy::Personalized).unwrap(),
            r#""personalized""#
        );
        assert_eq!(Strategy::Cached.to_string(), "cached");
    }

    #[test]
    fn test_cache_entry_fresh_then_expired() {
        let entry = CacheEntry::new(vec![], Duration::from_secs(300));
        assert!(!entry.is_expired(entry.inserted_at));
        assert!(!entry.is_expired(entry.inserted_at + chrono::Duration::seconds(300)));
        assert!(entry.is_expired(entry.inserted_at + chrono::Duration::seconds(301)));
    }

    #[test]
    fn test_cache_entry_from_the_future_is_expired() {
        let entry = CacheEntry::new(vec![], Duration::from_secs(300));
        assert!(entry.is_expired(entry.inserted_at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_recommendation_serde() {
        let rec = Recommendation {
            item_id: "tech_ai_news".to_string(),
            score: 0.95,
            explanation: "Trending in your network".to_string(),
            strategy: Strategy::Trending,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["item_id"], "tech_ai_news");
        assert_eq!(json["strategy"], "trending");
    }
}
