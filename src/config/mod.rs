//! Configuration module for MoodShift

mod app_config;

pub use app_config::AppConfig;
