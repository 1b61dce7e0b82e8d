use serde::Deserialize;
use std::time::Duration;

use crate::services::search::SearchPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root URL of the remote catalog store; endpoints live under `/api`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for remote calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Quiet period before an as-you-type metadata search fires
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Minimum characters before an as-you-type search is issued
    #[serde(default = "default_search_min_chars")]
    pub search_min_chars: usize,

    /// Metadata search results kept for display
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Recommendations requested per fetch
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: u32,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_search_debounce_ms() -> u64 {
    400
}

fn default_search_min_chars() -> usize {
    3
}

fn default_search_max_results() -> usize {
    8
}

fn default_recommendation_count() -> u32 {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            search_debounce_ms: default_search_debounce_ms(),
            search_min_chars: default_search_min_chars(),
            search_max_results: default_search_max_results(),
            recommendation_count: default_recommendation_count(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_policy(&self) -> SearchPolicy {
        SearchPolicy {
            min_chars: self.search_min_chars,
            debounce: Duration::from_millis(self.search_debounce_ms),
            max_results: self.search_max_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_for_missing_fields() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.search_min_chars, 3);
        assert_eq!(config.recommendation_count, 4);
    }

    #[test]
    fn test_search_policy_from_env_values() {
        let config: Config = envy::from_iter(vec![
            ("SEARCH_DEBOUNCE_MS".to_string(), "250".to_string()),
            ("SEARCH_MAX_RESULTS".to_string(), "5".to_string()),
        ])
        .unwrap();

        let policy = config.search_policy();
        assert_eq!(policy.debounce, Duration::from_millis(250));
        assert_eq!(policy.max_results, 5);
        assert_eq!(policy.min_chars, 3);
    }
}
