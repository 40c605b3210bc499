use serde::Deserialize;

use crate::services::recommendations::{DEFAULT_CANDIDATE_LIMIT, DEFAULT_TOP_N};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the product catalog CSV
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Path to the serialized TF-IDF vectorizer
    #[serde(default = "default_vectorizer_path")]
    pub vectorizer_path: String,

    /// Maximum number of candidates scored per request
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Number of recommendations returned when the request omits `top_n`
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_catalog_path() -> String {
    "ready.csv".to_string()
}

fn default_vectorizer_path() -> String {
    "model/tfidf_vectorizer.json".to_string()
}

fn default_candidate_limit() -> usize {
    DEFAULT_CANDIDATE_LIMIT
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
