use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::{self, UserPatch};
use crate::{
    audit::{self, AuditAction, AuditEntry, TargetType},
    auth::{
        repo as auth_repo,
        services::{is_valid_email, is_valid_phone, normalize_email},
        AdminUser,
    },
    db::{User, UserType},
    error::{ApiError, ApiResult},
    pagination::{Page, Paginated},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserListQuery {
    pub user_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UserMetadata {
    #[serde(rename_all = "camelCase")]
    Customer {
        customer_id: Option<Uuid>,
        booking_count: i64,
    },
    #[serde(rename_all = "camelCase")]
    Provider {
        provider_id: Option<Uuid>,
        verified: bool,
        verification_requested: bool,
        rating: f64,
        service_count: i64,
        booking_count: i64,
    },
    Admin,
}

#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStatusRequest {
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UserMessage {
    pub message: String,
    pub user: User,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:id/status", put(update_status))
}

/// Admin accounts are managed outside the console.
fn ensure_not_admin(user: &User, msg: &'static str) -> Result<(), ApiError> {
    if user.user_type == UserType::Admin {
        return Err(ApiError::forbidden(msg));
    }
    Ok(())
}

/// Allowed only on non-admins and only when it changes something.
pub fn check_status_change(user: &User, is_active: bool) -> Result<(), ApiError> {
    ensure_not_admin(user, "Cannot modify admin user status")?;
    if user.is_active == is_active {
        let state = if is_active { "active" } else { "inactive" };
        return Err(ApiError::validation(format!("User is already {state}")));
    }
    Ok(())
}

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    auth_repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Json<Paginated<User>>> {
    let page = Page::new(q.page, q.limit, 10);
    let user_type = match q.user_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => Some(
            UserType::parse(raw).ok_or_else(|| ApiError::validation("Invalid user type"))?,
        ),
        None => None,
    };
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (users, total) = tokio::try_join!(
        repo::list_users(&state.db, user_type, search, page.limit, page.offset()),
        repo::count_users(&state.db, user_type, search),
    )?;
    Ok(Json(Paginated::new(users, page, total)))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDetail>> {
    let user = load_user(&state, id).await?;
    let metadata = match user.user_type {
        UserType::Customer => {
            let meta = repo::customer_meta(&state.db, id).await?;
            UserMetadata::Customer {
                customer_id: meta.as_ref().map(|m| m.customer_id),
                booking_count: meta.map_or(0, |m| m.booking_count),
            }
        }
        UserType::Provider => match repo::provider_meta(&state.db, id).await? {
            Some(m) => UserMetadata::Provider {
                provider_id: Some(m.provider_id),
                verified: m.verified,
                verification_requested: m.verification_requested,
                rating: m.rating,
                service_count: m.service_count,
                booking_count: m.booking_count,
            },
            None => UserMetadata::Provider {
                provider_id: None,
                verified: false,
                verification_requested: false,
                rating: 0.0,
                service_count: 0,
                booking_count: 0,
            },
        },
        UserType::Admin => UserMetadata::Admin,
    };
    Ok(Json(UserDetail { user, metadata }))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserMessage>> {
    let existing = load_user(&state, id).await?;
    ensure_not_admin(&existing, "Cannot update admin user")?;

    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::validation("Please provide a valid email address"));
        }
        if email != existing.email && auth_repo::find_by_email(&state.db, email).await?.is_some() {
            return Err(ApiError::conflict("Email is already in use"));
        }
    }
    if let Some(phone) = payload.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_valid_phone(phone) {
            return Err(ApiError::validation("Please provide a valid phone number"));
        }
    }
    for name in [&payload.first_name, &payload.last_name].into_iter().flatten() {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Name cannot be empty"));
        }
    }

    let user = repo::update_user(
        &state.db,
        id,
        UserPatch {
            first_name: payload.first_name.as_deref().map(str::trim),
            last_name: payload.last_name.as_deref().map(str::trim),
            email: email.as_deref(),
            phone: payload.phone.as_deref().map(str::trim),
        },
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::UserUpdated, TargetType::User)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "email": user.email })),
    );
    info!(user_id = %id, admin_id = %admin.admin_id, "user updated by admin");
    Ok(Json(UserMessage {
        message: "User updated successfully".into(),
        user,
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<UserMessage>> {
    let is_active = payload
        .is_active
        .ok_or_else(|| ApiError::validation("isActive must be a boolean"))?;
    let existing = load_user(&state, id).await?;
    check_status_change(&existing, is_active).map_err(|e| {
        warn!(user_id = %id, error = %e, "status change refused");
        e
    })?;

    let user = repo::set_active(&state.db, id, is_active).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::UserStatusChanged, TargetType::User)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "isActive": is_active })),
    );
    let verb = if is_active { "activated" } else { "deactivated" };
    info!(user_id = %id, %verb, "user status changed");
    Ok(Json(UserMessage {
        message: format!("User {verb} successfully"),
        user,
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let existing = load_user(&state, id).await?;
    ensure_not_admin(&existing, "Cannot delete admin user")?;

    if !repo::delete_user(&state.db, id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::UserDeleted, TargetType::User)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "email": existing.email })),
    );
    info!(user_id = %id, admin_id = %admin.admin_id, "user deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use time::OffsetDateTime;

    fn user(user_type: UserType, is_active: bool) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            first_name: "Mia".into(),
            last_name: "Lopez".into(),
            email: "mia@example.com".into(),
            password_hash: "hash".into(),
            phone: None,
            user_type,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn deactivating_inactive_user_is_rejected() {
        let err = check_status_change(&user(UserType::Customer, false), false).unwrap_err();
        assert_eq!(err.parts().0, StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "User is already inactive");

        let err = check_status_change(&user(UserType::Provider, true), true).unwrap_err();
        assert_eq!(err.to_string(), "User is already active");
    }

    #[test]
    fn admin_status_is_untouchable() {
        let err = check_status_change(&user(UserType::Admin, true), false).unwrap_err();
        assert_eq!(err.parts().0, StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Cannot modify admin user status");
    }

    #[test]
    fn real_changes_are_allowed() {
        assert!(check_status_change(&user(UserType::Customer, true), false).is_ok());
        assert!(check_status_change(&user(UserType::Provider, false), true).is_ok());
    }

    #[test]
    fn metadata_is_tagged() {
        let json = serde_json::to_value(UserMetadata::Customer {
            customer_id: None,
            booking_count: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "customer");
        assert_eq!(json["bookingCount"], 3);
        assert_eq!(serde_json::to_value(UserMetadata::Admin).unwrap()["type"], "admin");
    }
}
