use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    audit::{self, AuditAction, AuditEntry, TargetType},
    auth::{
        jwt::JwtKeys, password::verify_password_blocking, repo as auth_repo, services::normalize_email,
        AdminUser,
    },
    db::{Admin, User, UserType},
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub message: &'static str,
    pub user: User,
    pub tokens: TokenPair,
    /// Same value as `tokens.access`, kept for older console builds.
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminProfile {
    #[serde(flatten)]
    pub user: User,
    pub admin: Admin,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid admin credentials")
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> ApiResult<Json<AdminLoginResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = match auth_repo::find_by_email(&state.db, &email).await? {
        Some(u) if u.user_type == UserType::Admin => u,
        _ => {
            warn!(%email, "admin login with unknown or non-admin account");
            return Err(invalid_credentials());
        }
    };
    let Some(admin_id) = auth_repo::find_admin_id(&state.db, user.id).await? else {
        warn!(user_id = %user.id, "admin user without admin record");
        return Err(invalid_credentials());
    };
    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated admin account");
        return Err(ApiError::forbidden("Admin account is deactivated"));
    }

    if !verify_password_blocking(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "admin login invalid password");
        audit::write(
            &state.db,
            AuditEntry::new(AuditAction::LoginAttempt, TargetType::Auth)
                .by(admin_id)
                .target(user.id)
                .details(json!({ "email": user.email, "success": false, "reason": "Invalid password" })),
        )
        .await;
        return Err(invalid_credentials());
    }

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_admin_access(user.id)?;
    let refresh = keys.sign_refresh(user.id, UserType::Admin)?;

    audit::write(
        &state.db,
        AuditEntry::new(AuditAction::LoginSuccess, TargetType::Auth)
            .by(admin_id)
            .target(user.id)
            .details(json!({ "email": user.email })),
    )
    .await;

    info!(user_id = %user.id, "admin logged in");
    Ok(Json(AdminLoginResponse {
        message: "Admin login successful",
        user,
        tokens: TokenPair {
            access: access.clone(),
            refresh,
            expires_in: keys.admin_expires_in(),
        },
        access_token: access,
    }))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<Json<AdminProfile>> {
    let user = auth_repo::find_by_id(&state.db, admin.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin user not found"))?;
    let record = auth_repo::find_admin(&state.db, admin.admin_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin user not found"))?;
    Ok(Json(AdminProfile { user, admin: record }))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let Some(token) = payload.refresh_token.filter(|t| !t.trim().is_empty()) else {
        return Err(ApiError::validation("Refresh token is required"));
    };

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(token.trim()).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::forbidden("Invalid refresh token")
    })?;
    if claims.role != UserType::Admin {
        return Err(ApiError::forbidden("Invalid admin account"));
    }

    auth_repo::find_admin_session(&state.db, claims.sub)
        .await?
        .filter(|s| s.user_type == UserType::Admin && s.is_active)
        .ok_or_else(|| ApiError::forbidden("Invalid admin account"))?;

    let access_token = keys.sign_admin_access(claims.sub)?;
    info!(user_id = %claims.sub, "admin token refreshed");
    Ok(Json(RefreshResponse {
        access_token,
        expires_in: keys.admin_expires_in(),
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    admin: AdminUser,
) -> ApiResult<Json<serde_json::Value>> {
    audit::write(
        &state.db,
        AuditEntry::new(AuditAction::Logout, TargetType::Auth)
            .by(admin.admin_id)
            .target(admin.user_id)
            .details(json!({ "email": admin.email })),
    )
    .await;
    info!(user_id = %admin.user_id, "admin logged out");
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use uuid::Uuid;

    fn server() -> (TestServer, AppState) {
        let state = AppState::fake();
        let server = TestServer::new(routes().with_state(state.clone())).unwrap();
        (server, state)
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let (server, _) = server();
        let res = server
            .post("/login")
            .json(&json!({ "email": "admin@localnest.com" }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Email and password are required");

        let res = server.post("/login").json(&json!({})).await;
        res.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_requires_token() {
        let (server, _) = server();
        let res = server.post("/refresh-token").json(&json!({})).await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Refresh token is required");
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_and_access_tokens() {
        let (server, state) = server();
        let res = server
            .post("/refresh-token")
            .json(&json!({ "refreshToken": "not.a.jwt" }))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Invalid refresh token");

        let access = JwtKeys::from_ref(&state).sign_admin_access(Uuid::new_v4()).unwrap();
        let res = server
            .post("/refresh-token")
            .json(&json!({ "refreshToken": access }))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn refresh_rejects_non_admin_refresh_token() {
        let (server, state) = server();
        let refresh = JwtKeys::from_ref(&state)
            .sign_refresh(Uuid::new_v4(), UserType::Customer)
            .unwrap();
        let res = server
            .post("/refresh-token")
            .json(&json!({ "refreshToken": refresh }))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Invalid admin account");
    }

    #[tokio::test]
    async fn profile_and_logout_require_admin_token() {
        let (server, _) = server();
        server.get("/profile").await.assert_status(StatusCode::UNAUTHORIZED);
        server.post("/logout").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn login_response_shape() {
        let now = time::OffsetDateTime::now_utc();
        let res = AdminLoginResponse {
            message: "Admin login successful",
            user: User {
                id: Uuid::new_v4(),
                first_name: "Ada".into(),
                last_name: "Admin".into(),
                email: "admin@localnest.com".into(),
                password_hash: "hash".into(),
                phone: None,
                user_type: UserType::Admin,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            tokens: TokenPair {
                access: "a".into(),
                refresh: "r".into(),
                expires_in: 28_800,
            },
            access_token: "a".into(),
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["tokens"]["expiresIn"], 28_800);
        assert_eq!(json["accessToken"], json["tokens"]["access"]);
        assert!(json["user"].get("passwordHash").is_none());
    }
}
