//! Spotify login routes

use actix_web::http::header;
use actix_web::middleware::from_fn;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::{debug, info};

use super::session::{require_session, SessionUser};
use super::AppState;
use crate::errors::{AppError, Result};
use crate::models::{ApiResponse, LoginResponse};

/// Query string the provider redirects back with
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Set by the provider when the user declined
    pub error: Option<String>,
}

/// Redirect the browser to the provider's consent page
#[get("/spotify")]
pub async fn spotify_login(state: web::Data<AppState>) -> HttpResponse {
    debug!("Redirecting to provider authorization");
    HttpResponse::Found()
        .insert_header((header::LOCATION, state.auth.auth_url()))
        .finish()
}

/// OAuth callback: exchange the code, return a session token and the user
#[get("/callback")]
pub async fn callback(
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse> {
    if let Some(reason) = &query.error {
        info!(reason = %reason, "Provider authorization declined");
        return Err(AppError::ValidationFailed(format!(
            "authorization denied: {}",
            reason
        )));
    }

    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::ValidationFailed("missing authorization code".to_string()))?;

    let (user, token) = state.auth.handle_callback(code).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LoginResponse { token, user })))
}

/// Current user
pub async fn me(state: web::Data<AppState>, session: SessionUser) -> Result<HttpResponse> {
    let user = state
        .users
        .get_user_by_id(&session.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// Configure auth routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(spotify_login).service(callback).service(
        web::resource("/me")
            .wrap(from_fn(require_session))
            .route(web::get().to(me)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{self, Services};
    use crate::db::UserRepository;
    use crate::models::User;
    use crate::stores::MemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use std::sync::Arc;

    macro_rules! app {
        ($services:expr, $users:expr) => {
            test::init_service(
                App::new()
                    .app_data(testing::state($services, $users))
                    .service(web::scope("/api/v1").configure(crate::api::configure)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_login_redirects() {
        let app = app!(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let req = test::TestRequest::get().uri("/api/v1/auth/spotify").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(header::LOCATION).unwrap();
        assert!(location.to_str().unwrap().starts_with("https://accounts.example.com/"));
    }

    #[actix_web::test]
    async fn test_callback_without_code_is_bad_request() {
        let services = Arc::new(Services::default());
        let app = app!(services.clone(), Arc::new(MemoryStore::new()));

        let req = test::TestRequest::get().uri("/api/v1/auth/callback").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(services.calls(), 0);
    }

    #[actix_web::test]
    async fn test_callback_returns_token_and_user() {
        let app = app!(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let req = test::TestRequest::get()
            .uri("/api/v1/auth/callback?code=good")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert!(body["data"]["token"].is_string());
        assert_eq!(body["data"]["user"]["spotify_id"], "spotify-user");
        assert!(body["data"]["user"].get("access_token").is_none());
    }

    #[actix_web::test]
    async fn test_failed_exchange_is_bad_gateway() {
        let app = app!(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let req = test::TestRequest::get()
            .uri("/api/v1/auth/callback?code=bad")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_me_requires_session() {
        let app = app!(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_me_returns_stored_user() {
        let users = Arc::new(MemoryStore::new());
        let mut user = User::new("spotify-me".to_string());
        user.display_name = "Dewi".to_string();
        user.access_token = "never-shown".to_string();
        let user = users.upsert_user(&user).await.unwrap();

        let app = app!(Arc::new(Services::default()), users);
        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header((header::AUTHORIZATION, testing::bearer(&user.id)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["display_name"], "Dewi");
        assert!(!body.to_string().contains("never-shown"));
    }

    #[actix_web::test]
    async fn test_me_for_deleted_user_is_not_found() {
        let app = app!(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header((header::AUTHORIZATION, testing::bearer("gone")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
