//! Playlist routes

use actix_web::{get, post, web, HttpResponse};
use tracing::debug;

use super::session::SessionUser;
use super::AppState;
use crate::errors::{AppError, Result};
use crate::models::{ApiResponse, GeneratePlaylistRequest};

/// Analyse a curhatan and build a playlist from it
#[post("")]
pub async fn create_playlist(
    state: web::Data<AppState>,
    session: SessionUser,
    body: web::Json<GeneratePlaylistRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    request.validate().map_err(AppError::ValidationFailed)?;

    let text = request.curhatan_text.trim();
    debug!(user_id = %session.user_id, chars = text.chars().count(), "Generating playlist");

    let analysis = state.emotions.analyze_text(text).await?;
    let playlist = state
        .playlists
        .generate_playlist(
            &session.user_id,
            text,
            analysis,
            request.playlist_name.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(playlist)))
}

/// Playlists of the current user, newest first
#[get("")]
pub async fn list_playlists(
    state: web::Data<AppState>,
    session: SessionUser,
) -> Result<HttpResponse> {
    let playlists = state.playlists.get_user_playlists(&session.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(playlists)))
}

/// One playlist of the current user
#[get("/{id}")]
pub async fn get_playlist(
    state: web::Data<AppState>,
    session: SessionUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();

    match state.playlists.get_playlist_by_id(&id).await? {
        // someone else's playlist is reported the same way as a missing one
        Some(playlist) if playlist.user_id == session.user_id => {
            Ok(HttpResponse::Ok().json(ApiResponse::ok(playlist)))
        }
        _ => Ok(HttpResponse::NotFound().json(ApiResponse::<()>::err("Playlist not found"))),
    }
}

/// Configure playlist routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_playlist)
        .service(list_playlists)
        .service(get_playlist);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{self, Services};
    use crate::stores::MemoryStore;
    use crate::utils::auth::SessionCodec;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use std::sync::Arc;

    macro_rules! app {
        ($services:expr) => {
            test::init_service(
                App::new()
                    .app_data(testing::state($services, Arc::new(MemoryStore::new())))
                    .service(web::scope("/api/v1").configure(crate::api::configure)),
            )
            .await
        };
    }

    const CURHATAN: &str = "hari ini aku merasa sedih karena hujan terus";

    #[actix_web::test]
    async fn test_generate_returns_envelope() {
        let services = Arc::new(Services::default());
        let app = app!(services.clone());

        let req = test::TestRequest::post()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .set_json(serde_json::json!({ "curhatan_text": CURHATAN, "playlist_name": "Hujan" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert!(body.get("error").is_none());
        assert_eq!(body["data"]["name"], "Hujan");
        assert_eq!(body["data"]["user_id"], "owner");
        assert_eq!(body["data"]["emotional_analysis"]["primary_mood"], "sad");
        // analysis + generation
        assert_eq!(services.calls(), 2);
    }

    #[actix_web::test]
    async fn test_short_curhatan_never_reaches_services() {
        let services = Arc::new(Services::default());
        let app = app!(services.clone());

        let req = test::TestRequest::post()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .set_json(serde_json::json!({ "curhatan_text": "sedih" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("curhatan_text"));
        assert_eq!(services.calls(), 0);
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app!(Arc::new(Services::default()));
        let req = test::TestRequest::post()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_expired_session_rejected_before_services() {
        let services = Arc::new(Services::default());
        let app = app!(services.clone());

        let codec = SessionCodec::new(testing::SECRET).unwrap();
        let issued = chrono::Utc::now().timestamp() - 48 * 3600;
        let token = codec.issue_at("owner", issued).unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .set_json(serde_json::json!({ "curhatan_text": CURHATAN }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(services.calls(), 0);
    }

    #[actix_web::test]
    async fn test_analysis_outage_is_service_unavailable() {
        let services = Arc::new(Services {
            fail_analysis: true,
            ..Default::default()
        });
        let app = app!(services.clone());

        let req = test::TestRequest::post()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .set_json(serde_json::json!({ "curhatan_text": CURHATAN }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        // generation never attempted
        assert_eq!(services.calls(), 1);
    }

    #[actix_web::test]
    async fn test_list_playlists() {
        let app = app!(Arc::new(Services::default()));
        let req = test::TestRequest::get()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_get_playlist_by_id() {
        let app = app!(Arc::new(Services::default()));

        let found = test::TestRequest::get()
            .uri("/api/v1/playlists/mine")
            .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
            .to_request();
        let resp = test::call_service(&app, found).await;
        assert_eq!(resp.status(), StatusCode::OK);

        for id in ["missing", "theirs"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/v1/playlists/{}", id))
                .insert_header((header::AUTHORIZATION, testing::bearer("owner")))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Playlist not found");
        }
    }

    #[actix_web::test]
    async fn test_listing_requires_session() {
        let services = Arc::new(Services::default());
        let app = app!(services.clone());
        let req = test::TestRequest::get()
            .uri("/api/v1/playlists")
            .insert_header((header::AUTHORIZATION, "Token abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(services.calls(), 0);
    }
}
