//! User table operations

use anyhow::Result;
use sqlx::{FromRow, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::models::User;

/// Database row for user table
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    spotify_id: String,
    display_name: String,
    email: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: String,
    profile_image_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            spotify_id: self.spotify_id,
            display_name: self.display_name,
            email: self.email,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            // an unreadable expiry counts as expired, which forces a refresh
            token_expires_at: parse_timestamp(&self.token_expires_at),
            profile_image_url: self.profile_image_url,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        }
    }
}

/// User table operations
pub struct UserTable;

impl UserTable {
    /// Get user by ID
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Get user by provider account ID
    pub async fn get_by_spotify_id(pool: &SqlitePool, spotify_id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE spotify_id = ?")
            .bind(spotify_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert a user or refresh the row that has the same provider ID
    pub async fn upsert(pool: &SqlitePool, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO user (
                id, spotify_id, display_name, email, access_token, refresh_token,
                token_expires_at, profile_image_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(spotify_id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                profile_image_url = excluded.profile_image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.spotify_id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.access_token)
        .bind(&user.refresh_token)
        .bind(format_timestamp(&user.token_expires_at))
        .bind(&user.profile_image_url)
        .bind(format_timestamp(&user.created_at))
        .bind(format_timestamp(&user.updated_at))
        .execute(pool)
        .await?;

        Self::get_by_spotify_id(pool, &user.spotify_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after upsert", user.spotify_id))
    }

    /// Update user
    pub async fn update(pool: &SqlitePool, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE user SET
                display_name = ?, email = ?, access_token = ?, refresh_token = ?,
                token_expires_at = ?, profile_image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.access_token)
        .bind(&user.refresh_token)
        .bind(format_timestamp(&user.token_expires_at))
        .bind(&user.profile_image_url)
        .bind(format_timestamp(&user.updated_at))
        .bind(&user.id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No user with id {}", user.id);
        }

        Ok(())
    }
}
