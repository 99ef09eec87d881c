// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The configuration is read once at startup and handed to every component
//! that needs it; request handlers never look at the environment.

use std::env;

/// Default SQLite database used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://rundown.db";

/// Shared secret Strava must echo during the webhook handshake when
/// `STRAVA_VERIFY_TOKEN` is unset.
pub const DEFAULT_VERIFY_TOKEN: &str = "STRAVA_WEBHOOK_VERIFY";

pub const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Default number of webhook events that may wait for classification.
pub const DEFAULT_WEBHOOK_QUEUE_CAPACITY: usize = 256;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection string
    pub database_url: String,
    /// Server port
    pub port: u16,
    /// Strava OAuth client ID
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Token Strava must present during the webhook handshake
    pub webhook_verify_token: String,
    /// Callback URL registered when subscribing without an explicit one
    pub webhook_callback_url: Option<String>,
    /// Strava REST API base URL
    pub strava_api_url: String,
    /// Strava OAuth base URL (token endpoint lives under it)
    pub strava_oauth_url: String,
    /// Bound on queued webhook events awaiting classification
    pub webhook_queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", v))?,
            Err(_) => 8080,
        };

        let webhook_queue_capacity = match env::var("WEBHOOK_QUEUE_CAPACITY") {
            Ok(v) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid("WEBHOOK_QUEUE_CAPACITY", v)),
            },
            Err(_) => DEFAULT_WEBHOOK_QUEUE_CAPACITY,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port,
            strava_client_id: non_empty("STRAVA_CLIENT_ID").unwrap_or_default(),
            strava_client_secret: non_empty("STRAVA_CLIENT_SECRET").unwrap_or_default(),
            webhook_verify_token: non_empty("STRAVA_VERIFY_TOKEN")
                .unwrap_or_else(|| DEFAULT_VERIFY_TOKEN.to_string()),
            webhook_callback_url: non_empty("STRAVA_WEBHOOK_CALLBACK_URL"),
            strava_api_url: non_empty("STRAVA_API_URL")
                .unwrap_or_else(|| DEFAULT_STRAVA_API_URL.to_string()),
            strava_oauth_url: non_empty("STRAVA_OAUTH_URL")
                .unwrap_or_else(|| DEFAULT_STRAVA_OAUTH_URL.to_string()),
            webhook_queue_capacity,
        })
    }

    /// Deterministic configuration for tests (in-memory database).
    pub fn test_default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            webhook_verify_token: "test_verify_token".to_string(),
            webhook_callback_url: Some("http://localhost:8080/api/webhooks/strava".to_string()),
            strava_api_url: DEFAULT_STRAVA_API_URL.to_string(),
            strava_oauth_url: DEFAULT_STRAVA_OAUTH_URL.to_string(),
            webhook_queue_capacity: 16,
        }
    }

    /// True when the Strava client credentials are present.
    pub fn has_strava_credentials(&self) -> bool {
        !self.strava_client_id.is_empty() && !self.strava_client_secret.is_empty()
    }
}

/// Read an environment variable, treating blank values as unset.
fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
