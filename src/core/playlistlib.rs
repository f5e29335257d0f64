//! Playlist generation and lookup

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::moodmap::MoodTable;
use super::services::{AuthService, PlaylistService};
use crate::db::PlaylistRepository;
use crate::errors::{AppError, Result};
use crate::models::{EmotionalAnalysis, Playlist};
use crate::plugins::{MusicProvider, PlaylistDraft};

/// Longest description the provider accepts
const MAX_DESCRIPTION_CHARS: usize = 300;

/// Builds playlists on the provider and records them locally
pub struct PlaylistGenerator {
    auth: Arc<dyn AuthService>,
    provider: Arc<dyn MusicProvider>,
    playlists: Arc<dyn PlaylistRepository>,
    table: Arc<MoodTable>,
    track_limit: u32,
    timeout: Duration,
}

impl PlaylistGenerator {
    pub fn new(
        auth: Arc<dyn AuthService>,
        provider: Arc<dyn MusicProvider>,
        playlists: Arc<dyn PlaylistRepository>,
        table: Arc<MoodTable>,
        track_limit: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            auth,
            provider,
            playlists,
            table,
            track_limit,
            timeout,
        }
    }
}

/// `"<Mood> Mood · <d Mon YYYY>"`, e.g. `"Sad Mood · 5 Mar 2025"`
pub fn synthesize_name(mood: &str, date: DateTime<Utc>) -> String {
    let mood = mood.trim();
    let mood = if mood.is_empty() { "neutral" } else { mood };

    let mut chars = mood.chars();
    let title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    format!("{} Mood · {}", title, date.format("%-d %b %Y"))
}

fn describe(analysis: &EmotionalAnalysis) -> String {
    let mut description = String::from("Made by MoodShift from your curhatan.");
    if !analysis.mood_description.is_empty() {
        description.push(' ');
        description.push_str(&analysis.mood_description);
    }
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[async_trait]
impl PlaylistService for PlaylistGenerator {
    async fn generate_playlist(
        &self,
        user_id: &str,
        curhatan_text: &str,
        analysis: EmotionalAnalysis,
        playlist_name: Option<&str>,
    ) -> Result<Playlist> {
        let user = self.auth.ensure_fresh_token(user_id).await?;

        let name = match playlist_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => synthesize_name(&analysis.primary_mood, Utc::now()),
        };
        let description = describe(&analysis);

        let draft = PlaylistDraft {
            name: name.clone(),
            description: description.clone(),
            features: analysis.audio_features,
            seed_genres: self
                .table
                .seed_genres(&analysis.primary_mood, analysis.secondary_mood.as_deref()),
            track_limit: self.track_limit,
        };

        let created = match tokio::time::timeout(
            self.timeout,
            self.provider
                .create_mood_playlist(&user.access_token, &user.spotify_id, &draft),
        )
        .await
        {
            Ok(Ok(created)) => created,
            Ok(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "Playlist creation failed");
                return Err(AppError::GenerationFailed(e.to_string()));
            }
            Err(_) => {
                warn!(user_id = %user.id, "Playlist creation timed out");
                return Err(AppError::GenerationFailed(
                    "playlist creation timed out".to_string(),
                ));
            }
        };

        if created.id.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "provider returned no playlist id".to_string(),
            ));
        }
        if created.track_count == 0 {
            return Err(AppError::GenerationFailed(
                "provider returned an empty playlist".to_string(),
            ));
        }

        let playlist = Playlist {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            spotify_id: created.id,
            name,
            description: Some(description),
            curhatan_text: curhatan_text.to_string(),
            emotional_analysis: analysis,
            track_count: created.track_count,
            image_url: created.image_url,
            external_url: created.external_url,
            created_at: Utc::now(),
        };

        self.playlists.insert_playlist(&playlist).await?;

        info!(
            user_id = %user.id,
            playlist_id = %playlist.id,
            tracks = playlist.track_count,
            mood = %playlist.emotional_analysis.primary_mood,
            "Playlist generated"
        );
        Ok(playlist)
    }

    async fn get_user_playlists(&self, user_id: &str) -> Result<Vec<Playlist>> {
        self.playlists.get_playlists_by_user(user_id).await
    }

    async fn get_playlist_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        self.playlists.get_playlist_by_id(id).await
    }
}
