//! Request and response shapes shared by the HTTP API

use serde::{Deserialize, Serialize};

use super::User;

/// Minimum length of a curhatan, in characters
pub const MIN_CURHATAN_CHARS: usize = 20;
/// Maximum length of a user-supplied playlist name, in characters
pub const MAX_PLAYLIST_NAME_CHARS: usize = 100;

/// Standard envelope for every API response.
///
/// Exactly one of `data` and `error` is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Body of `POST /playlists`
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePlaylistRequest {
    #[serde(default)]
    pub curhatan_text: String,
    #[serde(default)]
    pub playlist_name: Option<String>,
}

impl GeneratePlaylistRequest {
    /// Field-level validation, collecting every problem into one message
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();

        let text = self.curhatan_text.trim();
        if text.is_empty() {
            problems.push("curhatan_text is required".to_string());
        } else if text.chars().count() < MIN_CURHATAN_CHARS {
            problems.push(format!(
                "curhatan_text must be at least {} characters long",
                MIN_CURHATAN_CHARS
            ));
        }

        if let Some(name) = &self.playlist_name {
            if name.chars().count() > MAX_PLAYLIST_NAME_CHARS {
                problems.push(format!(
                    "playlist_name must be at most {} characters long",
                    MAX_PLAYLIST_NAME_CHARS
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

/// Payload returned after a successful OAuth callback
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
