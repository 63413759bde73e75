use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateProviderRequest, ProviderDetail, ProviderMessage, ProviderView,
        UpdateProviderRequest,
    },
    repo::{self, ProviderRow},
    verification,
};
use crate::{
    auth::AuthUser,
    bookings, catalog,
    db::{Provider, UserType},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(list_providers).post(create_provider))
        .route("/providers/service/:service_id", get(list_by_service))
        .route("/providers/user/:user_id", get(get_by_user))
        .route("/providers/:id", get(get_provider).put(update_provider))
        .route("/providers/:id/verify", post(request_verification))
}

/// Only the owning user may change a provider profile.
pub(crate) fn ensure_owner(provider: &Provider, auth: &AuthUser) -> Result<(), ApiError> {
    if provider.user_id != auth.id {
        return Err(ApiError::forbidden("Not authorized to modify this provider"));
    }
    Ok(())
}

/// Attaches the offered services to each joined provider row.
pub(crate) async fn load_views(db: &PgPool, rows: Vec<ProviderRow>) -> sqlx::Result<Vec<ProviderView>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.provider.id).collect();
    let services = catalog::repo::for_providers(db, &ids).await?;
    Ok(repo::assemble(rows, services, |provider, user, services| ProviderView {
        provider,
        user,
        services,
    }))
}

async fn load_detail(db: &PgPool, row: ProviderRow) -> ApiResult<ProviderDetail> {
    let (provider, user) = row.into_parts();
    let (services, bookings) = tokio::try_join!(
        catalog::repo::list_for_provider(db, provider.id),
        bookings::repo::list_for_provider(db, provider.id),
    )?;
    Ok(ProviderDetail {
        provider,
        user,
        services,
        bookings,
    })
}

#[instrument(skip(state))]
pub async fn list_providers(State(state): State<AppState>) -> ApiResult<Json<Vec<ProviderView>>> {
    let rows = repo::list_all(&state.db).await?;
    Ok(Json(load_views(&state.db, rows).await?))
}

#[instrument(skip(state))]
pub async fn list_by_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProviderView>>> {
    let rows = repo::list_by_service(&state.db, service_id).await?;
    Ok(Json(load_views(&state.db, rows).await?))
}

#[instrument(skip(state, _auth))]
pub async fn get_by_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ProviderDetail>> {
    let row = repo::find_row_by_user_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider profile not found"))?;
    Ok(Json(load_detail(&state.db, row).await?))
}

#[instrument(skip(state))]
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProviderDetail>> {
    let row = repo::find_row_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    Ok(Json(load_detail(&state.db, row).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_provider(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateProviderRequest>,
) -> ApiResult<(StatusCode, Json<ProviderMessage>)> {
    if auth.role != UserType::Provider {
        return Err(ApiError::forbidden("Provider access required"));
    }
    if payload.experience.trim().is_empty() || payload.location.trim().is_empty() {
        return Err(ApiError::validation("Experience and location are required"));
    }
    if payload.hourly_rate.is_some_and(|r| r < 0.0) {
        return Err(ApiError::validation("Hourly rate must be a positive number"));
    }
    if repo::find_by_user_id(&state.db, auth.id).await?.is_some() {
        return Err(ApiError::validation("Provider profile already exists"));
    }

    let provider = repo::create(&state.db, auth.id, &payload).await?;
    info!(provider_id = %provider.id, user_id = %auth.id, "provider profile created");
    Ok((
        StatusCode::CREATED,
        Json(ProviderMessage {
            message: "Provider profile created successfully",
            provider,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_provider(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProviderRequest>,
) -> ApiResult<Json<ProviderMessage>> {
    if payload.hourly_rate.is_some_and(|r| r < 0.0) {
        return Err(ApiError::validation("Hourly rate must be a positive number"));
    }
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    ensure_owner(&existing, &auth)?;

    let provider = repo::update(&state.db, id, &payload).await?;
    info!(provider_id = %provider.id, "provider profile updated");
    Ok(Json(ProviderMessage {
        message: "Provider profile updated successfully",
        provider,
    }))
}

#[instrument(skip(state))]
pub async fn request_verification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProviderMessage>> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    ensure_owner(&existing, &auth)?;
    verification::check_request(&existing).map_err(|e| {
        warn!(provider_id = %id, error = %e, "verification request refused");
        e
    })?;

    let provider = repo::request_verification(&state.db, id).await?;
    info!(provider_id = %provider.id, "verification requested");
    Ok(Json(ProviderMessage {
        message: "Verification request submitted successfully",
        provider,
    }))
}
