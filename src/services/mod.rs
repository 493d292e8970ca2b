pub mod cache;
pub mod fixtures;
pub mod recommendations;
pub mod similarity;
pub mod tracker;

pub use cache::RecommendationCache;
pub use recommendations::{Recommender, RecommenderSettings, TrendingCatalog};
pub use similarity::SimilarityEngine;
pub use tracker::EventTracker;
