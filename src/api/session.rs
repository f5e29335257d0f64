//! Bearer-token session gate

use actix_web::body::MessageBody;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use tracing::debug;

use super::AppState;
use crate::errors::{AppError, Result};
use crate::utils::auth::SessionCodec;

/// Identity of the caller, placed in request extensions by `require_session`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub user_id: String,
}

/// Check an `Authorization` header value and return the user id it carries.
///
/// The header must be exactly `Bearer <token>`. The user is not looked up.
pub fn authorize(header: Option<&str>, codec: &SessionCodec) -> Result<String> {
    let header = header.ok_or(AppError::Unauthorized)?;

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => {
            codec.verify(token).map_err(|_| AppError::Unauthorized)
        }
        _ => Err(AppError::Unauthorized),
    }
}

/// Middleware rejecting requests without a valid session token
pub async fn require_session(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> std::result::Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let verdict = match req.app_data::<web::Data<AppState>>() {
        Some(state) => {
            let header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            authorize(header, &state.codec)
        }
        None => Err(AppError::Internal(
            "application state not configured".to_string(),
        )),
    };

    match verdict {
        Ok(user_id) => {
            req.extensions_mut().insert(SessionUser { user_id });
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(e) => {
            debug!(path = %req.path(), "Rejected request without a valid session");
            Ok(req.error_response(e).map_into_right_body())
        }
    }
}

impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<SessionUser>()
                .cloned()
                .ok_or(AppError::Unauthorized),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{self, Services};
    use crate::stores::MemoryStore;
    use actix_web::middleware::from_fn;
    use actix_web::{test as actix_test, App, HttpResponse};
    use std::sync::Arc;

    fn codec() -> SessionCodec {
        SessionCodec::new(testing::SECRET).unwrap()
    }

    #[test]
    fn test_authorize_accepts_valid_bearer() {
        let codec = codec();
        let token = codec.issue("user-1").unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(authorize(Some(&header), &codec).unwrap(), "user-1");
    }

    #[test]
    fn test_authorize_rejects_bad_shapes() {
        let codec = codec();
        let token = codec.issue("user-1").unwrap();

        let cases = vec![
            None,
            Some(String::new()),
            Some(token.clone()),
            Some(format!("bearer {}", token)),
            Some(format!("Basic {}", token)),
            Some(format!("Bearer  {}", token)),
            Some(format!("Bearer {} extra", token)),
            Some("Bearer ".to_string()),
            Some("Bearer not-a-jwt".to_string()),
        ];

        for header in cases {
            assert!(
                matches!(
                    authorize(header.as_deref(), &codec),
                    Err(AppError::Unauthorized)
                ),
                "accepted {:?}",
                header
            );
        }
    }

    #[test]
    fn test_authorize_rejects_expired() {
        let codec = codec();
        let issued = chrono::Utc::now().timestamp() - 25 * 3600;
        let token = codec.issue_at("user-1", issued).unwrap();
        let header = format!("Bearer {}", token);
        assert!(authorize(Some(&header), &codec).is_err());
    }

    async fn whoami(user: SessionUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id)
    }

    #[actix_web::test]
    async fn test_middleware_passes_identity_through() {
        let state = testing::state(Arc::new(Services::default()), Arc::new(MemoryStore::new()));
        let app = actix_test::init_service(
            App::new().app_data(state).service(
                web::resource("/whoami")
                    .wrap(from_fn(require_session))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/whoami")
            .insert_header((header::AUTHORIZATION, testing::bearer("user-9")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "user-9");
    }

    #[actix_web::test]
    async fn test_extractor_without_middleware_is_unauthorized() {
        let app = actix_test::init_service(App::new().route("/whoami", web::get().to(whoami))).await;
        let req = actix_test::TestRequest::get().uri("/whoami").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
