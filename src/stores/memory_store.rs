//! Memory store - process-local repository selected with `DATABASE_URL=memory`

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::{PlaylistRepository, UserRepository};
use crate::errors::{AppError, Result};
use crate::models::{Playlist, User};

/// In-memory store for users and playlists
#[derive(Default)]
pub struct MemoryStore {
    /// Users by internal id
    users: RwLock<HashMap<String, User>>,
    /// Provider account id to internal id
    users_by_spotify_id: RwLock<HashMap<String, String>>,
    /// Playlists by internal id
    playlists: RwLock<HashMap<String, Playlist>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored playlists
    #[cfg(test)]
    pub fn playlist_count(&self) -> usize {
        self.playlists.read().len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn get_user_by_spotify_id(&self, spotify_id: &str) -> Result<Option<User>> {
        let index = self.users_by_spotify_id.read();
        let users = self.users.read();
        Ok(index.get(spotify_id).and_then(|id| users.get(id)).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<User> {
        let mut index = self.users_by_spotify_id.write();
        let mut users = self.users.write();

        let mut stored = user.clone();
        if let Some(existing) = index.get(&user.spotify_id).and_then(|id| users.get(id)) {
            stored.id = existing.id.clone();
            stored.created_at = existing.created_at;
        }

        index.insert(stored.spotify_id.clone(), stored.id.clone());
        users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        let existing = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::Storage(format!("No user with id {}", user.id)))?;

        let created_at = existing.created_at;
        *existing = user.clone();
        existing.created_at = created_at;
        Ok(())
    }
}

#[async_trait]
impl PlaylistRepository for MemoryStore {
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<()> {
        if !self.users.read().contains_key(&playlist.user_id) {
            return Err(AppError::Storage(format!(
                "Playlist owner {} does not exist",
                playlist.user_id
            )));
        }

        let mut playlists = self.playlists.write();
        if playlists.contains_key(&playlist.id) {
            return Err(AppError::Storage(format!(
                "Playlist {} already exists",
                playlist.id
            )));
        }
        playlists.insert(playlist.id.clone(), playlist.clone());
        Ok(())
    }

    async fn get_playlists_by_user(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let mut owned: Vec<Playlist> = self
            .playlists
            .read()
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn get_playlist_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        Ok(self.playlists.read().get(id).cloned())
    }
}
