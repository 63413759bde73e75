//! Admin console API, mounted under `/admin`.
//!
//! Every route except `/login` and `/refresh-token` requires an
//! [`AdminUser`](crate::auth::AdminUser): a missing or expired token yields
//! 401, anything else that is not a live admin session yields 403.

use crate::state::AppState;
use axum::Router;

pub mod analytics;
pub mod audit_logs;
pub mod bootstrap;
pub mod dashboard;
pub mod repo;
pub mod services;
pub mod session;
pub mod users;
pub mod verification;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(session::routes())
        .merge(users::routes())
        .merge(verification::routes())
        .merge(services::routes())
        .merge(dashboard::routes())
        .merge(analytics::routes())
        .merge(audit_logs::routes())
}

pub fn router() -> Router<AppState> {
    Router::new().nest("/admin", routes())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::claims::{Claims, TokenKind},
        db::UserType,
        testing::{access_token, bearer},
    };
    use axum::http::{header::AUTHORIZATION, StatusCode};
    use axum_test::TestServer;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn server() -> (TestServer, AppState) {
        let state = AppState::fake();
        let server = TestServer::new(router().with_state(state.clone())).unwrap();
        (server, state)
    }

    fn expired_admin_token(state: &AppState) -> String {
        let jwt = &state.config.jwt;
        let issued = OffsetDateTime::now_utc().unix_timestamp() - 10 * 3600;
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: issued as usize,
            exp: (issued + 8 * 3600) as usize,
            iss: jwt.issuer.clone(),
            aud: jwt.audience.clone(),
            kind: TokenKind::Access,
            role: UserType::Admin,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt.secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let (server, _) = server();
        for path in ["/admin/dashboard/stats", "/admin/users", "/admin/audit/logs"] {
            let res = server.get(path).await;
            res.assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn customer_token_is_forbidden() {
        let (server, state) = server();
        let token = access_token(&state, UserType::Customer);
        let res = server
            .get("/admin/analytics/overview")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
        let body: Value = res.json();
        assert_eq!(body["message"], "Admin privileges required");
    }

    #[tokio::test]
    async fn expired_admin_token_is_unauthorized() {
        let (server, state) = server();
        let token = expired_admin_token(&state);
        let res = server
            .get("/admin/dashboard/stats")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        res.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = res.json();
        assert_eq!(body["message"], "Admin session expired");
    }

    #[tokio::test]
    async fn garbage_token_is_forbidden() {
        let (server, _) = server();
        let res = server
            .put("/admin/providers/00000000-0000-0000-0000-000000000000/verify")
            .add_header(AUTHORIZATION, bearer("not.a.jwt"))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_is_public() {
        let (server, _) = server();
        let res = server.post("/admin/login").json(&serde_json::json!({})).await;
        res.assert_status(StatusCode::BAD_REQUEST);
    }
}
