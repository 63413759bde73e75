use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction, AuditEntry, TargetType},
    auth::AdminUser,
    catalog::repo::{self as catalog_repo, AdminServiceRow, ServiceFields, ServiceFilter, ServicePatch},
    db::Service,
    error::{ApiError, ApiResult},
    pagination::{Page, Paginated},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub average_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameCategoryRequest {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceMessage {
    pub message: &'static str,
    pub service: Service,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route("/services/categories", get(list_categories))
        .route("/services/categories/rename", put(rename_category))
        .route("/services/:id", put(update_service).delete(delete_service))
}

/// Maps the console's sort parameters onto a whitelisted ORDER BY clause.
/// Unknown columns fall back to newest first.
pub fn order_clause(sort_by: Option<&str>, sort_order: Option<&str>) -> String {
    let column = match sort_by.unwrap_or("createdAt") {
        "name" => "s.name",
        "category" => "s.category",
        "averagePrice" => "s.average_price",
        _ => "s.created_at",
    };
    let direction = match sort_order.map(str::to_ascii_lowercase).as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    format!("{column} {direction}, s.id")
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[instrument(skip(state, _admin))]
pub async fn list_services(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<ServiceListQuery>,
) -> ApiResult<Json<Paginated<AdminServiceRow>>> {
    let page = Page::new(q.page, q.limit, 10);
    let filter = ServiceFilter {
        search: non_empty(&q.search),
        category: non_empty(&q.category),
    };
    let order = order_clause(q.sort_by.as_deref(), q.sort_order.as_deref());

    let (services, total) = tokio::try_join!(
        catalog_repo::list_page(&state.db, &filter, &order, page.limit, page.offset()),
        catalog_repo::count_filtered(&state.db, &filter),
    )?;
    Ok(Json(Paginated::new(services, page, total)))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_service(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<ServiceRequest>,
) -> ApiResult<(StatusCode, Json<Service>)> {
    let (Some(name), Some(description), Some(category), Some(average_price)) = (
        non_empty(&payload.name),
        non_empty(&payload.description),
        non_empty(&payload.category),
        payload.average_price,
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };
    if average_price < 0.0 {
        return Err(ApiError::validation("Average price must be a positive number"));
    }

    let service = catalog_repo::create(
        &state.db,
        ServiceFields {
            name,
            description,
            category,
            average_price,
        },
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::ServiceCreated, TargetType::Service)
            .by(admin.admin_id)
            .target(service.id)
            .details(json!({ "name": service.name, "category": service.category })),
    );
    info!(service_id = %service.id, "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_service(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServiceRequest>,
) -> ApiResult<Json<ServiceMessage>> {
    if payload.average_price.is_some_and(|p| p < 0.0) {
        return Err(ApiError::validation("Average price must be a positive number"));
    }
    let service = catalog_repo::update(
        &state.db,
        id,
        ServicePatch {
            name: non_empty(&payload.name),
            description: payload.description.as_deref().map(str::trim),
            category: non_empty(&payload.category),
            average_price: payload.average_price,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Service not found"))?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::ServiceUpdated, TargetType::Service)
            .by(admin.admin_id)
            .target(id)
            .details(json!({
                "name": payload.name,
                "description": payload.description,
                "category": payload.category,
                "averagePrice": payload.average_price,
            })),
    );
    info!(service_id = %id, "service updated");
    Ok(Json(ServiceMessage {
        message: "Service updated successfully",
        service,
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_service(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let service = catalog_repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let bookings = catalog_repo::count_bookings(&state.db, id).await?;
    if bookings > 0 {
        warn!(service_id = %id, bookings, "refusing to delete booked service");
        return Err(ApiError::conflict("Cannot delete service with existing bookings"));
    }
    catalog_repo::delete(&state.db, id).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::ServiceDeleted, TargetType::Service)
            .by(admin.admin_id)
            .target(id)
            .details(json!({ "name": service.name })),
    );
    info!(service_id = %id, "service deleted");
    Ok(Json(json!({ "message": "Service deleted successfully" })))
}

#[instrument(skip(state, _admin))]
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(catalog_repo::categories(&state.db).await?))
}

#[instrument(skip(state, admin, payload))]
pub async fn rename_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<RenameCategoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (Some(from), Some(to)) = (non_empty(&payload.from), non_empty(&payload.to)) else {
        return Err(ApiError::validation("from and to are required"));
    };

    let updated = catalog_repo::rename_category(&state.db, from, to).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::CategoryRenamed, TargetType::Service)
            .by(admin.admin_id)
            .details(json!({ "from": from, "to": to, "count": updated })),
    );
    info!(%from, %to, updated, "category renamed");
    Ok(Json(json!({ "message": "Category renamed", "updated": updated })))
}
