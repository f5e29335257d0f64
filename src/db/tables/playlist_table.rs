//! Playlist table operations

use anyhow::{Context, Result};
use sqlx::{FromRow, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::models::{EmotionalAnalysis, Playlist};

/// Database row for playlist table
#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: String,
    user_id: String,
    spotify_id: String,
    name: String,
    description: Option<String>,
    curhatan_text: String,
    emotional_analysis: String,
    track_count: i64,
    image_url: Option<String>,
    external_url: String,
    created_at: String,
}

impl PlaylistRow {
    fn into_playlist(self) -> Result<Playlist> {
        let emotional_analysis: EmotionalAnalysis = serde_json::from_str(&self.emotional_analysis)
            .with_context(|| format!("Corrupt emotional analysis on playlist {}", self.id))?;

        Ok(Playlist {
            id: self.id,
            user_id: self.user_id,
            spotify_id: self.spotify_id,
            name: self.name,
            description: self.description,
            curhatan_text: self.curhatan_text,
            emotional_analysis,
            track_count: self.track_count.max(0) as u32,
            image_url: self.image_url,
            external_url: self.external_url,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

/// Playlist table operations
pub struct PlaylistTable;

impl PlaylistTable {
    /// Get all playlists of a user, newest first
    pub async fn all_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Playlist>> {
        let rows: Vec<PlaylistRow> = sqlx::query_as(
            "SELECT * FROM playlist WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(|r| r.into_playlist()).collect()
    }

    /// Get playlist by ID
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Playlist>> {
        let row: Option<PlaylistRow> = sqlx::query_as("SELECT * FROM playlist WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(|r| r.into_playlist()).transpose()
    }

    /// Insert playlist
    pub async fn insert(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
        let analysis = serde_json::to_string(&playlist.emotional_analysis)?;

        sqlx::query(
            r#"
            INSERT INTO playlist (
                id, user_id, spotify_id, name, description, curhatan_text,
                emotional_analysis, track_count, image_url, external_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.user_id)
        .bind(&playlist.spotify_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.curhatan_text)
        .bind(&analysis)
        .bind(playlist.track_count as i64)
        .bind(&playlist.image_url)
        .bind(&playlist.external_url)
        .bind(format_timestamp(&playlist.created_at))
        .execute(pool)
        .await?;

        Ok(())
    }
}
