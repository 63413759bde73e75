use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys, repo};
use crate::{db::UserType, error::ApiError, state::AppState};

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Any signed-in user, identified by an access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserType,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Access token required"))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            e
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Access token required"));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// An active admin whose account still has an admin record.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Admin access token required"))?;

        let claims = match JwtKeys::from_ref(state).verify(token) {
            Ok(c) => c,
            Err(ApiError::TokenExpired) => {
                return Err(ApiError::unauthorized("Admin session expired"));
            }
            Err(e) => {
                warn!(error = %e, "invalid admin token");
                return Err(ApiError::forbidden("Invalid admin token"));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(ApiError::forbidden("Invalid admin token"));
        }
        if claims.role != UserType::Admin {
            warn!(user_id = %claims.sub, "non-admin token on admin route");
            return Err(ApiError::forbidden("Admin privileges required"));
        }

        let session = repo::find_admin_session(&state.db, claims.sub)
            .await?
            .filter(|s| s.is_active && s.user_type == UserType::Admin)
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "admin session no longer valid");
                ApiError::forbidden("Invalid admin session")
            })?;

        Ok(AdminUser {
            user_id: session.user_id,
            admin_id: session.admin_id,
            email: session.email,
        })
    }
}
