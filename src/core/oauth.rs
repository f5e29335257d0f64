//! Provider OAuth exchange and token refresh

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::services::AuthService;
use crate::config::AppConfig;
use crate::db::UserRepository;
use crate::errors::{AppError, Result};
use crate::models::User;
use crate::plugins::{MusicProvider, ProviderError, TokenGrant};
use crate::utils::auth::SessionCodec;

/// Drives the authorization-code flow and keeps provider tokens fresh
pub struct OAuthCoordinator {
    provider: Arc<dyn MusicProvider>,
    users: Arc<dyn UserRepository>,
    codec: SessionCodec,
    authorize_url: Url,
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
    refresh_margin: ChronoDuration,
    timeout: Duration,
    /// One lock per user id, serializing read-check-refresh-write
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OAuthCoordinator {
    pub fn new(
        provider: Arc<dyn MusicProvider>,
        users: Arc<dyn UserRepository>,
        codec: SessionCodec,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let authorize_url = Url::parse(provider.authorize_endpoint())?;

        Ok(Self {
            provider,
            users,
            codec,
            authorize_url,
            client_id: config.spotify_client_id.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            scopes: config.scopes(),
            refresh_margin: ChronoDuration::seconds(config.token_refresh_margin_secs.max(0)),
            timeout: config.provider_timeout(),
            refresh_locks: DashMap::new(),
        })
    }

    fn refresh_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn apply_grant(user: &mut User, grant: TokenGrant) {
        let now = Utc::now();
        user.access_token = grant.access_token;
        // the provider may keep the previous refresh token valid and omit a new one
        if let Some(refresh_token) = grant.refresh_token.filter(|t| !t.is_empty()) {
            user.refresh_token = refresh_token;
        }
        user.token_expires_at = now + ChronoDuration::seconds(grant.expires_in.max(0));
        user.updated_at = now;
    }

    /// Read-check-refresh-write; the caller holds the user's refresh lock
    async fn refresh_locked(&self, user: &mut User) -> Result<()> {
        // another request may have refreshed while we waited for the lock
        if let Some(stored) = self.users.get_user_by_id(&user.id).await? {
            *user = stored;
        }

        if !user.token_needs_refresh(Utc::now(), self.refresh_margin) {
            return Ok(());
        }

        if user.refresh_token.is_empty() {
            return Err(AppError::RefreshFailed(
                "no refresh token stored".to_string(),
            ));
        }

        debug!(user_id = %user.id, "Refreshing provider access token");

        let grant = match tokio::time::timeout(
            self.timeout,
            self.provider.refresh_token(&user.refresh_token),
        )
        .await
        {
            Ok(Ok(grant)) => grant,
            Ok(Err(ProviderError::InvalidGrant(reason))) => {
                warn!(user_id = %user.id, %reason, "Provider rejected the refresh token");
                return Err(AppError::RefreshFailed(reason));
            }
            Ok(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "Provider token refresh failed");
                return Err(AppError::ProviderUnavailable(
                    "token refresh failed, try again later".to_string(),
                ));
            }
            Err(_) => {
                warn!(user_id = %user.id, "Provider token refresh timed out");
                return Err(AppError::ProviderUnavailable(
                    "token refresh timed out, try again later".to_string(),
                ));
            }
        };

        Self::apply_grant(user, grant);
        self.users.save_user(user).await?;

        info!(user_id = %user.id, "Provider access token refreshed");
        Ok(())
    }
}

#[async_trait]
impl AuthService for OAuthCoordinator {
    fn auth_url(&self) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "));
        url.to_string()
    }

    async fn handle_callback(&self, code: &str) -> Result<(User, String)> {
        let grant = match tokio::time::timeout(self.timeout, self.provider.exchange_code(code)).await
        {
            Ok(Ok(grant)) => grant,
            Ok(Err(e)) => {
                warn!(error = %e, "Authorization code exchange failed");
                return Err(AppError::ExchangeFailed(e.to_string()));
            }
            Err(_) => return Err(AppError::ExchangeFailed("token request timed out".to_string())),
        };

        let profile = match tokio::time::timeout(
            self.timeout,
            self.provider.current_profile(&grant.access_token),
        )
        .await
        {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                warn!(error = %e, "Profile fetch failed");
                return Err(AppError::ProfileFetchFailed(e.to_string()));
            }
            Err(_) => {
                return Err(AppError::ProfileFetchFailed(
                    "profile request timed out".to_string(),
                ))
            }
        };

        let mut user = self
            .users
            .get_user_by_spotify_id(&profile.id)
            .await?
            .unwrap_or_else(|| User::new(profile.id.clone()));

        user.display_name = profile
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| profile.id.clone());
        user.email = profile.email.unwrap_or_default();
        user.profile_image_url = profile.image_url;
        Self::apply_grant(&mut user, grant);

        let user = self.users.upsert_user(&user).await?;
        let token = self.codec.issue(&user.id)?;

        info!(user_id = %user.id, spotify_id = %user.spotify_id, "User signed in");
        Ok((user, token))
    }

    async fn refresh_access_token(&self, user: &mut User) -> Result<()> {
        let lock = self.refresh_lock(&user.id);
        let result = {
            let _guard = lock.lock().await;
            self.refresh_locked(user).await
        };
        drop(lock);

        // waiters and new callers hold their own clone, so only an idle lock goes
        self.refresh_locks
            .remove_if(&user.id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn ensure_fresh_token(&self, user_id: &str) -> Result<User> {
        let mut user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        self.refresh_access_token(&mut user).await?;
        Ok(user)
    }
}
