use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Anthropic key for chat completions. When absent the assistant
    /// runs in degraded mode and answers with a configuration notice.
    pub anthropic_api_key: Option<String>,
    /// OpenAI key for embeddings. When absent retrieval falls back to
    /// recency ordering.
    pub openai_api_key: Option<String>,
    pub planning_center_app_id: Option<String>,
    pub planning_center_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
            planning_center_app_id: env::var("PLANNING_CENTER_APP_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            planning_center_secret: env::var("PLANNING_CENTER_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }
}
