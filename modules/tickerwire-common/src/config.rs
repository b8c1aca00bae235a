use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI providers
    pub anthropic_api_key: String,
    pub voyage_api_key: String,
    pub generation_model: String,
    pub embedding_model: String,

    // Pipeline
    pub agent_id: String,
    pub channel_label: String,
    pub dedup_window_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            voyage_api_key: required_env("VOYAGE_API_KEY"),
            generation_model: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "voyage-3-large".to_string()),
            agent_id: env::var("AGENT_ID").unwrap_or_else(|_| "tickerwire".to_string()),
            channel_label: env::var("CHANNEL_LABEL").unwrap_or_else(|_| "feed".to_string()),
            dedup_window_hours: env::var("DEDUP_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("DEDUP_WINDOW_HOURS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
