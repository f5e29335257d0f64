//! External capabilities used by the core services
//!
//! The music provider (OAuth identity, track selection, playlist creation)
//! and the text-analysis provider sit behind the traits below. Concrete
//! clients live in the submodules.

pub mod gemini;
pub mod spotify;

pub use gemini::GeminiAnalyzer;
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::AudioFeatures;

/// Errors reported by the music provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    /// The provider refused an authorization code or refresh token
    #[error("grant rejected: {0}")]
    InvalidGrant(String),

    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no tracks matched the requested features")]
    NoTracks,
}

impl ProviderError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Connection(e.to_string())
        }
    }
}

/// Longest upstream error body kept in an error message
const MAX_EXCERPT_CHARS: usize = 200;

/// First line of an upstream error body, cut short
pub(crate) fn excerpt(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or_default().trim();
    let mut short: String = line.chars().take(MAX_EXCERPT_CHARS).collect();
    if line.chars().count() > MAX_EXCERPT_CHARS {
        short.push_str("...");
    }
    short
}

/// Errors reported by the text-analysis provider
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("analysis API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("analyzer is not configured")]
    NotConfigured,
}

/// Access/refresh token pair issued by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the provider keeps the previous refresh token valid
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

/// Identity of the authenticated provider account
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

/// What to ask the provider for when building a playlist
#[derive(Debug, Clone)]
pub struct PlaylistDraft {
    pub name: String,
    pub description: String,
    pub features: AudioFeatures,
    pub seed_genres: Vec<String>,
    pub track_limit: u32,
}

/// A playlist the provider has created and filled
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPlaylist {
    pub id: String,
    pub external_url: String,
    pub image_url: Option<String>,
    pub track_count: u32,
}

/// Mood labels as reported by the text-analysis provider, before mapping
#[derive(Debug, Clone, PartialEq)]
pub struct RawMood {
    pub primary_mood: String,
    pub secondary_mood: Option<String>,
    pub intensity: f64,
    pub description: String,
    pub keywords: Vec<String>,
}

/// Music provider capability
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// Provider authorization endpoint used to build the login URL
    fn authorize_endpoint(&self) -> &str;

    /// Exchange a single-use authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Obtain a new access token from a refresh token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;

    /// Fetch the profile of the account owning `access_token`
    async fn current_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;

    /// Select tracks matching `draft.features` and create a playlist holding them
    async fn create_mood_playlist(
        &self,
        access_token: &str,
        owner_id: &str,
        draft: &PlaylistDraft,
    ) -> Result<CreatedPlaylist, ProviderError>;
}

/// Text-analysis capability
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<RawMood, AnalyzerError>;
}
