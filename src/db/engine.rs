//! Database engine and connection management

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use super::repository::{PlaylistRepository, UserRepository};
use super::tables::{PlaylistTable, UserTable};
use crate::errors;
use crate::models::{Playlist, User};

/// SQLite-backed repository
#[derive(Clone)]
pub struct DbEngine {
    pool: SqlitePool,
}

impl DbEngine {
    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url: {}", url))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30))
            .pragma("foreign_keys", "ON");
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        // every in-memory connection is its own database, so keep exactly one
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let engine = Self { pool };
        engine.create_tables().await?;
        Ok(engine)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user (
                id TEXT PRIMARY KEY,
                spotify_id TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                access_token TEXT NOT NULL DEFAULT '',
                refresh_token TEXT NOT NULL DEFAULT '',
                token_expires_at TEXT NOT NULL,
                profile_image_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_user_spotify_id ON user(spotify_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create user table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlist (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                spotify_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                curhatan_text TEXT NOT NULL,
                emotional_analysis TEXT NOT NULL,
                track_count INTEGER NOT NULL CHECK (track_count >= 0),
                image_url TEXT,
                external_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES user(id)
            );
            CREATE INDEX IF NOT EXISTS idx_playlist_user_id ON playlist(user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create playlist table")?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for DbEngine {
    async fn get_user_by_id(&self, id: &str) -> errors::Result<Option<User>> {
        Ok(UserTable::get_by_id(&self.pool, id).await?)
    }

    async fn get_user_by_spotify_id(&self, spotify_id: &str) -> errors::Result<Option<User>> {
        Ok(UserTable::get_by_spotify_id(&self.pool, spotify_id).await?)
    }

    async fn upsert_user(&self, user: &User) -> errors::Result<User> {
        Ok(UserTable::upsert(&self.pool, user).await?)
    }

    async fn save_user(&self, user: &User) -> errors::Result<()> {
        Ok(UserTable::update(&self.pool, user).await?)
    }
}

#[async_trait]
impl PlaylistRepository for DbEngine {
    async fn insert_playlist(&self, playlist: &Playlist) -> errors::Result<()> {
        Ok(PlaylistTable::insert(&self.pool, playlist).await?)
    }

    async fn get_playlists_by_user(&self, user_id: &str) -> errors::Result<Vec<Playlist>> {
        Ok(PlaylistTable::all_for_user(&self.pool, user_id).await?)
    }

    async fn get_playlist_by_id(&self, id: &str) -> errors::Result<Option<Playlist>> {
        Ok(PlaylistTable::get_by_id(&self.pool, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFeatures, EmotionalAnalysis};
    use chrono::{Duration as ChronoDuration, Utc};

    async fn memory_engine() -> DbEngine {
        DbEngine::connect("sqlite::memory:").await.unwrap()
    }

    fn analysis() -> EmotionalAnalysis {
        EmotionalAnalysis {
            primary_mood: "sad".to_string(),
            secondary_mood: Some("lonely".to_string()),
            mood_intensity: 0.7,
            mood_description: "Sedang sedih".to_string(),
            keywords: vec!["hujan".to_string()],
            audio_features: AudioFeatures::NEUTRAL,
        }
    }

    fn playlist_for(user: &User, name: &str, created_at: chrono::DateTime<Utc>) -> Playlist {
        Playlist {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            spotify_id: format!("sp-{}", name),
            name: name.to_string(),
            description: None,
            curhatan_text: "hari ini terasa berat sekali untukku".to_string(),
            emotional_analysis: analysis(),
            track_count: 20,
            image_url: None,
            external_url: format!("https://open.spotify.com/playlist/sp-{}", name),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity() {
        let db = memory_engine().await;

        let mut first = User::new("spotify-1".to_string());
        first.display_name = "Ayu".to_string();
        first.access_token = "access-1".to_string();
        let stored = db.upsert_user(&first).await.unwrap();
        assert_eq!(stored.id, first.id);

        let mut again = User::new("spotify-1".to_string());
        again.display_name = "Ayu R.".to_string();
        again.access_token = "access-2".to_string();
        let updated = db.upsert_user(&again).await.unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.display_name, "Ayu R.");
        assert_eq!(updated.access_token, "access-2");
        assert_eq!(
            crate::db::tables::format_timestamp(&updated.created_at),
            crate::db::tables::format_timestamp(&first.created_at)
        );
    }

    #[tokio::test]
    async fn test_save_user_roundtrips_tokens() {
        let db = memory_engine().await;
        let mut user = db.upsert_user(&User::new("spotify-2".to_string())).await.unwrap();

        let expires = Utc::now() + ChronoDuration::hours(1);
        user.access_token = "fresh".to_string();
        user.refresh_token = "rotated".to_string();
        user.token_expires_at = expires;
        db.save_user(&user).await.unwrap();

        let loaded = db.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "fresh");
        assert_eq!(loaded.refresh_token, "rotated");
        assert_eq!(loaded.token_expires_at.timestamp(), expires.timestamp());
    }

    #[tokio::test]
    async fn test_save_unknown_user_fails() {
        let db = memory_engine().await;
        let ghost = User::new("nobody".to_string());
        assert!(db.save_user(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn test_playlists_newest_first() {
        let db = memory_engine().await;
        let user = db.upsert_user(&User::new("spotify-3".to_string())).await.unwrap();
        let other = db.upsert_user(&User::new("spotify-4".to_string())).await.unwrap();

        let now = Utc::now();
        let older = playlist_for(&user, "older", now - ChronoDuration::minutes(5));
        let newer = playlist_for(&user, "newer", now);
        let foreign = playlist_for(&other, "foreign", now);
        db.insert_playlist(&older).await.unwrap();
        db.insert_playlist(&newer).await.unwrap();
        db.insert_playlist(&foreign).await.unwrap();

        let listed = db.get_playlists_by_user(&user.id).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
        assert_eq!(listed[0].emotional_analysis, analysis());
    }

    #[tokio::test]
    async fn test_playlist_lookup() {
        let db = memory_engine().await;
        let user = db.upsert_user(&User::new("spotify-5".to_string())).await.unwrap();
        let playlist = playlist_for(&user, "one", Utc::now());
        db.insert_playlist(&playlist).await.unwrap();

        let found = db.get_playlist_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(found.spotify_id, "sp-one");
        assert_eq!(found.track_count, 20);

        assert!(db.get_playlist_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_playlist_requires_owner() {
        let db = memory_engine().await;
        let stranger = User::new("unsaved".to_string());
        let playlist = playlist_for(&stranger, "orphan", Utc::now());
        assert!(db.insert_playlist(&playlist).await.is_err());
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("moodshift.db").display());

        let user_id = {
            let db = DbEngine::connect(&url).await.unwrap();
            let user = db.upsert_user(&User::new("spotify-6".to_string())).await.unwrap();
            drop(db);
            user.id
        };

        let reopened = DbEngine::connect(&url).await.unwrap();
        let user = reopened.get_user_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(user.spotify_id, "spotify-6");
    }
}
