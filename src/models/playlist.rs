//! Playlist model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmotionalAnalysis;

/// A generated playlist, persisted once the provider confirmed creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    /// Internal ID (uuid v4)
    pub id: String,
    /// Owner user ID
    pub user_id: String,
    /// Playlist ID on the provider side
    pub spotify_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The journal entry this playlist was generated from
    pub curhatan_text: String,
    pub emotional_analysis: EmotionalAnalysis,
    pub track_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Shareable provider URL
    pub external_url: String,
    pub created_at: DateTime<Utc>,
}
