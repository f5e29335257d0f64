//! Database module for MoodShift
//!
//! This module handles all database operations using SQLx with SQLite.

mod engine;
mod repository;
pub mod tables;

pub use engine::DbEngine;
pub use repository::{PlaylistRepository, UserRepository};
