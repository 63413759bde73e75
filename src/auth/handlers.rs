use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, CustomerProfile, LoginRequest, ProfileResponse, ProfileUpdatedResponse,
            ProviderProfile, RegisterRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::{self, NewAccount},
        services::{is_valid_email, normalize_email, validate_profile_update, validate_registration},
    },
    bookings, catalog,
    db::{User, UserType},
    error::{ApiError, ApiResult},
    providers,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    payload.email = normalize_email(&payload.email);
    let user_type = validate_registration(&payload).map_err(|e| {
        warn!(email = %payload.email, error = %e, "invalid registration");
        e
    })?;

    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict("User already exists with this email"));
    }

    let hash = hash_password_blocking(payload.password.clone()).await?;
    let phone = payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let user = repo::create_account(
        &state.db,
        NewAccount {
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            email: &payload.email,
            password_hash: &hash,
            phone,
            user_type,
        },
    )
    .await?;

    let token = JwtKeys::from_ref(&state).sign_access(user.id, user.user_type)?;

    info!(user_id = %user.id, email = %user.email, user_type = user.user_type.as_str(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("Please provide a valid email address"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let Some(user) = repo::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    if !verify_password_blocking(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(ApiError::unauthorized("Account is deactivated"));
    }

    let token = JwtKeys::from_ref(&state).sign_access(user.id, user.user_type)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user,
        token,
    }))
}

async fn load_profile(db: &PgPool, user: User) -> ApiResult<ProfileResponse> {
    let (customer, provider) = match user.user_type {
        UserType::Customer => {
            let customer = match bookings::repo::find_customer_by_user(db, user.id).await? {
                Some(c) => {
                    let bookings = bookings::repo::list_for_customer(db, c.id).await?;
                    Some(CustomerProfile { customer: c, bookings })
                }
                None => None,
            };
            (customer, None)
        }
        UserType::Provider => {
            let provider = match providers::repo::find_by_user_id(db, user.id).await? {
                Some(p) => {
                    let (services, bookings) = tokio::try_join!(
                        catalog::repo::list_for_provider(db, p.id),
                        bookings::repo::list_for_provider(db, p.id),
                    )?;
                    Some(ProviderProfile {
                        provider: p,
                        services,
                        bookings,
                    })
                }
                None => None,
            };
            (None, provider)
        }
        UserType::Admin => (None, None),
    };

    Ok(ProfileResponse {
        user,
        customer,
        provider,
    })
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = repo::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(load_profile(&state.db, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileUpdatedResponse>> {
    validate_profile_update(&payload)?;

    let user = match repo::update_profile(&state.db, auth.id, &payload).await {
        Ok(u) => u,
        Err(sqlx::Error::RowNotFound) => return Err(ApiError::not_found("User not found")),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated successfully",
        user: load_profile(&state.db, user).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> TestServer {
        TestServer::new(auth_routes().with_state(AppState::fake())).unwrap()
    }

    #[tokio::test]
    async fn register_validates_before_touching_db() {
        let res = server()
            .post("/auth/register")
            .json(&json!({
                "firstName": "Sam",
                "lastName": "Lee",
                "email": "sam@example.com",
                "password": "weak",
                "userType": "customer"
            }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json();
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn login_requires_password() {
        let res = server()
            .post("/auth/login")
            .json(&json!({ "email": "sam@example.com" }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Password is required");
    }

    #[tokio::test]
    async fn profile_requires_token() {
        let res = server().get("/auth/profile").await;
        res.assert_status(StatusCode::UNAUTHORIZED);
    }
}
