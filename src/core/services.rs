//! Service capabilities consumed by the HTTP API

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{EmotionalAnalysis, Playlist, User};

/// Provider login and provider token lifecycle
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Provider authorization URL the browser is sent to
    fn auth_url(&self) -> String;

    /// Complete a login from the authorization code the provider redirected with.
    /// Returns the stored user and a fresh session token.
    async fn handle_callback(&self, code: &str) -> Result<(User, String)>;

    /// Refresh the provider access token of `user` in place when it is expired
    /// or about to expire
    async fn refresh_access_token(&self, user: &mut User) -> Result<()>;

    /// Load the user and make sure its provider token is usable
    async fn ensure_fresh_token(&self, user_id: &str) -> Result<User>;
}

/// Curhatan analysis
#[async_trait]
pub trait EmotionService: Send + Sync {
    async fn analyze_text(&self, text: &str) -> Result<EmotionalAnalysis>;
}

/// Playlist generation and lookup
#[async_trait]
pub trait PlaylistService: Send + Sync {
    async fn generate_playlist(
        &self,
        user_id: &str,
        curhatan_text: &str,
        analysis: EmotionalAnalysis,
        playlist_name: Option<&str>,
    ) -> Result<Playlist>;

    /// Playlists of a user, newest first
    async fn get_user_playlists(&self, user_id: &str) -> Result<Vec<Playlist>>;

    async fn get_playlist_by_id(&self, id: &str) -> Result<Option<Playlist>>;
}
