//! Data models for MoodShift
//!
//! This module contains the core data structures shared by the services,
//! the repositories and the HTTP API.

mod api;
mod emotion;
mod playlist;
mod user;

pub use api::{ApiResponse, GeneratePlaylistRequest, LoginResponse};
pub use emotion::{AudioFeatures, EmotionalAnalysis};
pub use playlist::Playlist;
pub use user::User;
