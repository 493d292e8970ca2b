use std::cmp::Ordering;
use std::collections::HashMap;

use crate::db::UserItemSet;
use crate::models::SimilarityScore;

/// Jaccard similarity |A ∩ B| / |A ∪ B|
///
/// Two empty sets have no defined similarity; they score 0.
pub fn jaccard(a: &UserItemSet, b: &UserItemSet) -> f64 {
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Ranks a user's peers by Jaccard similarity of their item sets
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine {
    threshold: f64,
    top_k: usize,
}

impl SimilarityEngine {
    pub fn new(threshold: f64, top_k: usize) -> Self {
        Self { threshold, top_k }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Peers whose similarity is strictly above the threshold, best first
    ///
    /// Ties are broken by peer id ascending. An empty result means there is
    /// no collaborative signal for the user.
    pub fn similar_users(
        &self,
        user_id: &str,
        interactions: &HashMap<String, UserItemSet>,
    ) -> Vec<SimilarityScore> {
        let empty = UserItemSet::new();
        let own_items = interactions.get(user_id).unwrap_or(&empty);
        self.similar_to_items(user_id, own_items, interactions)
    }

    /// Same as [`similar_users`](Self::similar_users) with an explicit item set for the target
    pub fn similar_to_items(
        &self,
        user_id: &str,
        own_items: &UserItemSet,
        interactions: &HashMap<String, UserItemSet>,
    ) -> Vec<SimilarityScore> {
        let mut scores: Vec<SimilarityScore> = interactions
            .iter()
            .filter(|(other, _)| other.as_str() != user_id)
            .filter_map(|(other, other_items)| {
                let score = jaccard(own_items, other_items);
                if score <= self.threshold {
                    return None;
                }
                Some(SimilarityScore {
                    user: user_id.to_string(),
                    similar_user: other.clone(),
                    score,
                    shared_items: own_items.intersection(other_items).cloned().collect(),
                })
            })
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.similar_user.cmp(&b.similar_user))
        });
        scores.truncate(self.top_k);

        tracing::debug!(
            user_id = %user_id,
            candidates = interactions.len().saturating_sub(1),
            similar = scores.len(),
            "Computed similar users"
        );

        scores
    }
}
