//! Configuration module for the Mind Goal backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! A missing database path puts the service in demo mode, backed by the
//! in-memory store instead of SQLite.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default base URL for the chat-completion API.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file; `None` selects demo mode (in-memory store)
    pub db_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// API key for the chat-completion service; `None` disables AI features
    pub openai_api_key: Option<String>,
    /// Base URL for the chat-completion service
    pub openai_base_url: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("MINDGOAL_API_PSK").ok();

        let db_path = env::var("MINDGOAL_DB_PATH").ok().map(PathBuf::from);

        let bind_addr = env::var("MINDGOAL_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid MINDGOAL_BIND_ADDR format");

        let openai_api_key = env::var("MINDGOAL_OPENAI_API_KEY").ok();

        let openai_base_url = env::var("MINDGOAL_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());

        let log_level = env::var("MINDGOAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_psk,
            db_path,
            bind_addr,
            openai_api_key,
            openai_base_url,
            log_level,
        }
    }

    /// Whether the service runs against the in-memory demo store.
    pub fn demo_mode(&self) -> bool {
        self.db_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("MINDGOAL_API_PSK");
        env::remove_var("MINDGOAL_DB_PATH");
        env::remove_var("MINDGOAL_BIND_ADDR");
        env::remove_var("MINDGOAL_OPENAI_API_KEY");
        env::remove_var("MINDGOAL_OPENAI_BASE_URL");
        env::remove_var("MINDGOAL_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert!(config.db_path.is_none());
        assert!(config.demo_mode());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.log_level, "info");
    }
}
