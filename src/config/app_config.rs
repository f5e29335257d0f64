//! Process configuration for MoodShift
//!
//! Values come from built-in defaults, then a `.env` file if present, then the
//! process environment. Credentials default to empty so an unconfigured
//! process never talks to a real provider by accident.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Comma separated list of allowed origins, `*` for any
    pub cors_allow_origins: String,

    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    /// Space separated OAuth scopes
    pub spotify_scopes: String,

    pub gemini_api_key: String,
    pub gemini_model: String,

    /// Symmetric key used to sign session tokens
    pub session_secret: String,
    /// Lifetime of an issued session token
    pub session_ttl_hours: i64,

    /// sqlx connection string
    pub database_url: String,

    /// Upper bound for every call to an external provider
    pub provider_timeout_secs: u64,
    /// Refresh provider tokens this many seconds before they expire
    pub token_refresh_margin_secs: i64,
    /// Number of tracks requested for a generated playlist
    pub playlist_track_limit: u32,

    /// Optional JSON file overriding the built-in mood table
    #[serde(default)]
    pub mood_table_path: Option<String>,
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build(config::Environment::default())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(config::Environment::default().source(Some(vars)))
    }

    fn build(env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("cors_allow_origins", "*")?
            .set_default("spotify_client_id", "")?
            .set_default("spotify_client_secret", "")?
            .set_default(
                "spotify_redirect_uri",
                "http://localhost:8080/api/v1/auth/callback",
            )?
            .set_default("spotify_scopes", DEFAULT_SCOPES)?
            .set_default("gemini_api_key", "")?
            .set_default("gemini_model", "gemini-1.5-flash")?
            .set_default("session_secret", "")?
            .set_default("session_ttl_hours", 24)?
            .set_default("database_url", "sqlite:moodshift.db")?
            .set_default("provider_timeout_secs", 15)?
            .set_default("token_refresh_margin_secs", 60)?
            .set_default("playlist_track_limit", 20)?
            .add_source(env)
            .build()
            .context("Failed to assemble configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Timeout applied to each provider call
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    /// Requested OAuth scopes
    pub fn scopes(&self) -> Vec<String> {
        self.spotify_scopes
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Allowed CORS origins; `None` means any origin
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_allow_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    /// Log which integrations are missing credentials
    pub fn warn_missing_credentials(&self) {
        if self.spotify_client_id.is_empty() || self.spotify_client_secret.is_empty() {
            tracing::warn!(
                "SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET not set; login will fail until configured"
            );
        }
        if self.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY not set; mood analysis will be unavailable");
        }
    }
}

const DEFAULT_SCOPES: &str =
    "user-read-private user-read-email playlist-modify-public playlist-modify-private";
