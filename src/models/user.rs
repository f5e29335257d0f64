//! User model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user authenticated through the music provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Internal ID (uuid v4)
    pub id: String,
    /// Provider account ID
    pub spotify_id: String,
    /// Display name reported by the provider
    #[serde(default)]
    pub display_name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Provider access token (not serialized to JSON)
    #[serde(skip)]
    pub access_token: String,
    /// Provider refresh token (not serialized to JSON)
    #[serde(skip)]
    pub refresh_token: String,
    /// When the provider access token stops being valid (not serialized to JSON)
    #[serde(skip, default = "epoch")]
    pub token_expires_at: DateTime<Utc>,
    /// Profile image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl User {
    /// Create a new user for a provider account, with a fresh internal id
    pub fn new(spotify_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            spotify_id,
            display_name: String::new(),
            email: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            token_expires_at: epoch(),
            profile_image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the provider token is expired or expires within `margin`
    pub fn token_needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.access_token.is_empty() || now + margin >= self.token_expires_at
    }
}
