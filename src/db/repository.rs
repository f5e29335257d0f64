//! Repository capabilities for users and playlists

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{Playlist, User};

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_user_by_spotify_id(&self, spotify_id: &str) -> Result<Option<User>>;

    /// Insert the user, or update the existing row with the same provider id.
    ///
    /// An existing row keeps its internal id and `created_at`. Returns the
    /// stored user.
    async fn upsert_user(&self, user: &User) -> Result<User>;

    /// Overwrite the mutable fields of an existing user, keyed by internal id
    async fn save_user(&self, user: &User) -> Result<()>;
}

/// Playlist persistence
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<()>;

    /// All playlists owned by `user_id`, newest first
    async fn get_playlists_by_user(&self, user_id: &str) -> Result<Vec<Playlist>>;

    async fn get_playlist_by_id(&self, id: &str) -> Result<Option<Playlist>>;
}
