//! Utility modules for MoodShift

pub mod auth;
