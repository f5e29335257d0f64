//! REST API routes for MoodShift

pub mod auth;
pub mod playlist;
pub mod session;

use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{web, HttpResponse, ResponseError};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{AuthService, EmotionService, PlaylistService};
use crate::db::UserRepository;
use crate::errors::AppError;
use crate::models::ApiResponse;
use crate::utils::auth::SessionCodec;

/// Everything a request handler may reach, built once in `main`
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub emotions: Arc<dyn EmotionService>,
    pub playlists: Arc<dyn PlaylistService>,
    pub users: Arc<dyn UserRepository>,
    pub codec: SessionCodec,
}

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Malformed JSON bodies get the envelope too
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            AppError::ValidationFailed(format!("invalid request body: {}", err)).into()
        }))
        // Auth routes
        .service(web::scope("/auth").configure(auth::configure))
        // Playlist routes, all behind a session
        .service(
            web::scope("/playlists")
                .wrap(from_fn(session::require_session))
                .configure(playlist::configure),
        );
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredential | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RefreshFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::ExchangeFailed(_) | AppError::ProfileFetchFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::ProviderUnavailable(_) | AppError::AnalysisUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // details stay in the log
            AppError::Storage(_) | AppError::Internal(_) => {
                error!(error = %self, "Request failed");
                "internal server error".to_string()
            }
            _ if self.requires_reauth() => {
                info!(error = %self, "Provider session expired, client must log in again");
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::err(message))
    }
}
