use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEntry, TargetType},
    auth::AdminUser,
    catalog,
    db::Service,
    error::{ApiError, ApiResult},
    pagination::{Page, Paginated},
    providers::{repo as provider_repo, verification},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PendingQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProvider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub services: Vec<Service>,
    pub total_services: i64,
    pub experience: String,
    pub location: String,
    pub hourly_rate: Option<f64>,
    pub bio: Option<String>,
    pub verified: bool,
    pub verification_requested: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verification_requested_at: Option<OffsetDateTime>,
    pub verification_rejected_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    pub verified_by: Option<Uuid>,
    pub verification_requested: bool,
    pub verification_rejected_reason: Option<String>,
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/providers/pending-verifications", get(list_pending))
        .route("/verifications/pending", get(list_pending))
        .route("/providers/:id/verify", put(verify_provider))
        .route("/providers/:id/reject", put(reject_provider))
}

/// Oldest request first; `search` matches name, email or location.
#[instrument(skip(state, _admin))]
pub async fn list_pending(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PendingQuery>,
) -> ApiResult<Json<Paginated<PendingProvider>>> {
    let page = Page::new(q.page, q.limit, 10);
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (rows, total) = tokio::try_join!(
        provider_repo::list_pending(&state.db, search, page.limit, page.offset()),
        provider_repo::count_pending(&state.db, search),
    )?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.provider.provider.id).collect();
    let mut services = catalog::repo::for_providers(&state.db, &ids).await?;

    let data = rows
        .into_iter()
        .map(|row| {
            let total_services = row.total_services;
            let (p, user) = row.provider.into_parts();
            PendingProvider {
                id: p.id,
                user_id: p.user_id,
                name: format!("{} {}", user.first_name, user.last_name),
                email: user.email,
                phone: user.phone,
                services: services.remove(&p.id).unwrap_or_default(),
                total_services,
                experience: p.experience,
                location: p.location,
                hourly_rate: p.hourly_rate,
                bio: p.bio,
                verified: p.verified,
                verification_requested: p.verification_requested,
                verification_requested_at: p.verification_requested_at,
                verification_rejected_reason: p.verification_rejected_reason,
            }
        })
        .collect();
    Ok(Json(Paginated::new(data, page, total)))
}

#[instrument(skip(state, admin, payload))]
pub async fn verify_provider(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<VerifyRequest>>,
) -> ApiResult<Json<VerificationResult>> {
    let notes = payload.and_then(|Json(p)| p.notes);
    let row = provider_repo::find_row_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    verification::check_verify(&row.provider).map_err(|e| {
        warn!(provider_id = %id, error = %e, "verification refused");
        e
    })?;

    let provider = provider_repo::mark_verified(&state.db, id, admin.user_id).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::ProviderVerified, TargetType::Provider)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "providerId": id, "notes": notes })),
    );
    info!(provider_id = %id, admin_id = %admin.admin_id, "provider verified");

    Ok(Json(VerificationResult {
        id: provider.id,
        user_id: provider.user_id,
        name: format!("{} {}", row.first_name, row.last_name),
        email: row.email,
        verified: provider.verified,
        verified_at: provider.verified_at,
        verified_by: provider.verified_by,
        verification_requested: provider.verification_requested,
        verification_rejected_reason: provider.verification_rejected_reason,
        message: "Provider verified successfully",
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn reject_provider(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectRequest>>,
) -> ApiResult<Json<VerificationResult>> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let reason = verification::validate_reason(reason.as_deref())?;
    let row = provider_repo::find_row_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    verification::check_reject(&row.provider).map_err(|e| {
        warn!(provider_id = %id, error = %e, "rejection refused");
        e
    })?;

    let provider = provider_repo::mark_rejected(&state.db, id, reason).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::ProviderVerificationRejected, TargetType::Provider)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "providerId": id, "reason": reason })),
    );
    info!(provider_id = %id, admin_id = %admin.admin_id, "provider verification rejected");

    Ok(Json(VerificationResult {
        id: provider.id,
        user_id: provider.user_id,
        name: format!("{} {}", row.first_name, row.last_name),
        email: row.email,
        verified: provider.verified,
        verified_at: provider.verified_at,
        verified_by: provider.verified_by,
        verification_requested: provider.verification_requested,
        verification_rejected_reason: provider.verification_rejected_reason,
        message: "Provider verification rejected",
    }))
}
