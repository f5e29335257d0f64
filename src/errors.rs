//! Error taxonomy shared by the services and the HTTP API

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed, forged or expired session token
    #[error("invalid session credential")]
    InvalidCredential,

    /// Missing or malformed authorization header
    #[error("unauthorized")]
    Unauthorized,

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("could not fetch provider profile: {0}")]
    ProfileFetchFailed(String),

    /// The provider refused the stored refresh token; the user has to log in again
    #[error("provider session expired, re-authentication required: {0}")]
    RefreshFailed(String),

    /// The provider could not be reached or failed transiently; the stored session is still valid
    #[error("music provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("mood analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("playlist generation failed: {0}")]
    GenerationFailed(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("user not found")]
    UserNotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the caller must send the user through the OAuth flow again
    pub fn requires_reauth(&self) -> bool {
        matches!(self, AppError::RefreshFailed(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Storage(format!("{:#}", e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
