//! Spotify Web API client

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    excerpt, CreatedPlaylist, MusicProvider, PlaylistDraft, ProviderError, ProviderProfile,
    TokenGrant,
};
use crate::models::AudioFeatures;

const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Spotify accepts at most five seeds per recommendation request
const MAX_SEEDS: usize = 5;
/// Spotify caps recommendation results at 100
const MAX_RECOMMENDATIONS: u32 = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<TrackRef>,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    uri: String,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: String,
}

#[derive(Debug, Deserialize)]
struct CreatePlaylistResponse {
    id: String,
    external_urls: ExternalUrls,
    #[serde(default)]
    images: Option<Vec<Image>>,
}

#[derive(Debug, Serialize)]
struct AddTracksRequest<'a> {
    uris: &'a [String],
}

/// Spotify client for OAuth, recommendations and playlist creation
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_url: SPOTIFY_API_URL.to_string(),
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, ProviderError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Spotify token endpoint error body");
            return Err(token_error(status.as_u16(), &body));
        }

        let token: TokenResponse = resp.json().await.map_err(ProviderError::from_reqwest)?;
        if token.access_token.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "token response without access_token".to_string(),
            ));
        }

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
            expires_in: token.expires_in,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let resp = request.send().await.map_err(ProviderError::from_reqwest)?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Spotify error body");
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            })
        }
    }

    async fn recommend(
        &self,
        access_token: &str,
        draft: &PlaylistDraft,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/recommendations", self.api_url);
        let resp = self
            .send(
                self.client
                    .get(&url)
                    .bearer_auth(access_token)
                    .query(&recommendation_params(draft)),
            )
            .await?;

        let body: RecommendationsResponse =
            resp.json().await.map_err(ProviderError::from_reqwest)?;
        Ok(body.tracks.into_iter().map(|t| t.uri).collect())
    }

    /// Best-effort removal of a playlist that could not be filled
    async fn discard_playlist(&self, access_token: &str, playlist_id: &str) {
        let url = format!("{}/playlists/{}/followers", self.api_url, playlist_id);
        if let Err(e) = self
            .send(self.client.delete(&url).bearer_auth(access_token))
            .await
        {
            warn!(playlist_id, "Failed to discard unfilled playlist: {}", e);
        }
    }
}

#[async_trait]
impl MusicProvider for SpotifyClient {
    fn authorize_endpoint(&self) -> &str {
        SPOTIFY_AUTHORIZE_URL
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn current_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        let url = format!("{}/me", self.api_url);
        let resp = self
            .send(self.client.get(&url).bearer_auth(access_token))
            .await?;
        let me: MeResponse = resp.json().await.map_err(ProviderError::from_reqwest)?;

        Ok(ProviderProfile {
            id: me.id,
            display_name: me.display_name,
            email: me.email,
            image_url: me.images.into_iter().next().map(|i| i.url),
        })
    }

    async fn create_mood_playlist(
        &self,
        access_token: &str,
        owner_id: &str,
        draft: &PlaylistDraft,
    ) -> Result<CreatedPlaylist, ProviderError> {
        let uris = self.recommend(access_token, draft).await?;
        if uris.is_empty() {
            return Err(ProviderError::NoTracks);
        }
        debug!(owner_id, tracks = uris.len(), "Recommendations received");

        let url = format!("{}/users/{}/playlists", self.api_url, owner_id);
        let resp = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(access_token)
                    .json(&CreatePlaylistRequest {
                        name: &draft.name,
                        description: &draft.description,
                        public: false,
                    }),
            )
            .await?;
        let created: CreatePlaylistResponse =
            resp.json().await.map_err(ProviderError::from_reqwest)?;

        let url = format!("{}/playlists/{}/tracks", self.api_url, created.id);
        if let Err(e) = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(access_token)
                    .json(&AddTracksRequest { uris: &uris }),
            )
            .await
        {
            self.discard_playlist(access_token, &created.id).await;
            return Err(e);
        }

        Ok(CreatedPlaylist {
            id: created.id,
            external_url: created.external_urls.spotify,
            image_url: created
                .images
                .and_then(|images| images.into_iter().next())
                .map(|i| i.url),
            track_count: uris.len() as u32,
        })
    }
}

/// Map a failed token endpoint response to a provider error
fn token_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" || err.error == "invalid_request" => {
            ProviderError::InvalidGrant(err.error_description.unwrap_or(err.error))
        }
        Ok(err) => ProviderError::Api {
            status,
            message: excerpt(&err.error_description.unwrap_or(err.error)),
        },
        Err(_) => ProviderError::Api {
            status,
            message: excerpt(body),
        },
    }
}

/// Web API errors look like `{"error":{"status":429,"message":"..."}}`
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }

    #[derive(Deserialize)]
    struct Detail {
        #[serde(default)]
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(env) if !env.error.message.is_empty() => excerpt(&env.error.message),
        _ => excerpt(body),
    }
}

/// Query parameters for the recommendations endpoint
fn recommendation_params(draft: &PlaylistDraft) -> Vec<(&'static str, String)> {
    let AudioFeatures {
        valence,
        energy,
        tempo,
        danceability,
        acousticness,
        instrumentalness,
    } = draft.features;

    let seeds: Vec<&str> = draft
        .seed_genres
        .iter()
        .map(String::as_str)
        .take(MAX_SEEDS)
        .collect();
    let seeds = if seeds.is_empty() {
        "pop".to_string()
    } else {
        seeds.join(",")
    };

    vec![
        ("seed_genres", seeds),
        ("limit", draft.track_limit.clamp(1, MAX_RECOMMENDATIONS).to_string()),
        ("target_valence", format!("{:.3}", valence)),
        ("target_energy", format!("{:.3}", energy)),
        ("target_tempo", format!("{:.1}", tempo)),
        ("target_danceability", format!("{:.3}", danceability)),
        ("target_acousticness", format!("{:.3}", acousticness)),
        ("target_instrumentalness", format!("{:.3}", instrumentalness)),
    ]
}
