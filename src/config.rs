use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; the in-memory event store is used when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; the in-memory cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a cached recommendation list, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Count used when a request omits one or sends a non-positive value
    #[serde(default = "default_recommendation_count")]
    pub default_recommendation_count: usize,

    /// Recent views required before personalizing
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    /// Number of recent views read per request
    #[serde(default = "default_recent_history_limit")]
    pub recent_history_limit: usize,

    /// Similarities must be strictly above this to count
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Number of similar users kept per request
    #[serde(default = "default_similar_users_top_k")]
    pub similar_users_top_k: usize,

    /// Seeds the in-memory store with deterministic demo interactions
    #[serde(default)]
    pub demo_seed: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_recommendation_count() -> usize {
    10
}

fn default_min_history() -> usize {
    3
}

fn default_recent_history_limit() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.1
}

fn default_similar_users_top_k() -> usize {
    3
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the recommendation pipeline cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            anyhow::bail!(
                "SIMILARITY_THRESHOLD must be within [0, 1], got {}",
                self.similarity_threshold
            );
        }
        if self.similar_users_top_k == 0 {
            anyhow::bail!("SIMILAR_USERS_TOP_K must be positive");
        }
        if self.default_recommendation_count == 0 {
            anyhow::bail!("DEFAULT_RECOMMENDATION_COUNT must be positive");
        }
        if self.cache_ttl_secs == 0 {
            anyhow::bail!("CACHE_TTL_SECS must be positive");
        }
        if self.recent_history_limit < self.min_history {
            anyhow::bail!(
                "RECENT_HISTORY_LIMIT ({}) must be at least MIN_HISTORY ({})",
                self.recent_history_limit,
                self.min_history
            );
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            host: default_host(),
            port: default_port(),
            cache_ttl_secs: default_cache_ttl_secs(),
            default_recommendation_count: default_recommendation_count(),
            min_history: default_min_history(),
            recent_history_limit: default_recent_history_limit(),
            similarity_threshold: default_similarity_threshold(),
            similar_users_top_k: default_similar_users_top_k(),
            demo_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.default_recommendation_count, 10);
        assert_eq!(config.min_history, 3);
        assert_eq!(config.similar_users_top_k, 3);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_ok!(config.validate());
    }

    #[test]
    fn test_envy_applies_defaults_and_overrides() {
        let vars = vec![
            ("PORT".to_string(), "9090".to_string()),
            ("SIMILARITY_THRESHOLD".to_string(), "0.25".to_string()),
            ("DEMO_SEED".to_string(), "42".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.similarity_threshold, 0.25);
        assert_eq!(config.demo_seed, Some(42));
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let config = Config {
            similarity_threshold: 1.5,
            ..Config::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let config = Config {
            similar_users_top_k: 0,
            ..Config::default()
        };
        assert_err!(config.validate());
    }
}
