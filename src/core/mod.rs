//! Core services for MoodShift

pub mod mood;
pub mod moodmap;
pub mod oauth;
pub mod playlistlib;
pub mod services;

pub use mood::MoodAnalyzer;
pub use moodmap::MoodTable;
pub use oauth::OAuthCoordinator;
pub use playlistlib::PlaylistGenerator;
pub use services::{AuthService, EmotionService, PlaylistService};
