use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::{self, ServiceWithCount};
use crate::{
    auth::AuthUser,
    db::Service,
    error::{ApiError, ApiResult},
    providers::{self, dto::ProviderView},
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: Service,
    pub providers: Vec<ProviderView>,
    pub provider_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkServiceRequest {
    pub service_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ProviderServicesResponse {
    pub message: &'static str,
    pub services: Vec<Service>,
}

pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/:id", get(get_service))
        .route(
            "/services/provider/:provider_id",
            get(list_provider_services).post(add_provider_service),
        )
        .route(
            "/services/provider/:provider_id/:service_id",
            delete(remove_provider_service),
        )
}

#[instrument(skip(state))]
pub async fn list_services(State(state): State<AppState>) -> ApiResult<Json<Vec<ServiceWithCount>>> {
    Ok(Json(repo::list_with_counts(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceDetail>> {
    let service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;
    let rows = providers::repo::list_by_service(&state.db, id).await?;
    let providers = providers::load_views(&state.db, rows).await?;
    Ok(Json(ServiceDetail {
        service,
        provider_count: providers.len(),
        providers,
    }))
}

#[instrument(skip(state, _auth))]
pub async fn list_provider_services(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(provider_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Service>>> {
    if providers::repo::find_by_id(&state.db, provider_id).await?.is_none() {
        return Err(ApiError::not_found("Provider not found"));
    }
    Ok(Json(repo::list_for_provider(&state.db, provider_id).await?))
}

#[instrument(skip(state))]
pub async fn add_provider_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(provider_id): Path<Uuid>,
    Json(payload): Json<LinkServiceRequest>,
) -> ApiResult<(StatusCode, Json<ProviderServicesResponse>)> {
    let provider = providers::repo::find_by_id(&state.db, provider_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    providers::ensure_owner(&provider, &auth)?;

    if repo::find_by_id(&state.db, payload.service_id).await?.is_none() {
        return Err(ApiError::not_found("Service not found"));
    }
    if !repo::link(&state.db, provider_id, payload.service_id).await? {
        warn!(%provider_id, service_id = %payload.service_id, "service already linked");
        return Err(ApiError::conflict("Provider already offers this service"));
    }

    info!(%provider_id, service_id = %payload.service_id, "service added to provider");
    Ok((
        StatusCode::CREATED,
        Json(ProviderServicesResponse {
            message: "Service added to provider successfully",
            services: repo::list_for_provider(&state.db, provider_id).await?,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn remove_provider_service(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((provider_id, service_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProviderServicesResponse>> {
    let provider = providers::repo::find_by_id(&state.db, provider_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))?;
    providers::ensure_owner(&provider, &auth)?;

    if !repo::unlink(&state.db, provider_id, service_id).await? {
        return Err(ApiError::not_found("Provider does not offer this service"));
    }

    info!(%provider_id, %service_id, "service removed from provider");
    Ok(Json(ProviderServicesResponse {
        message: "Service removed from provider successfully",
        services: repo::list_for_provider(&state.db, provider_id).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    #[tokio::test]
    async fn linking_requires_token() {
        let server = TestServer::new(service_routes().with_state(AppState::fake())).unwrap();
        let res = server
            .post(&format!("/services/provider/{}", Uuid::new_v4()))
            .json(&json!({ "serviceId": Uuid::new_v4() }))
            .await;
        res.assert_status(StatusCode::UNAUTHORIZED);

        let res = server
            .delete(&format!("/services/provider/{}/{}", Uuid::new_v4(), Uuid::new_v4()))
            .await;
        res.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn detail_serializes_flat() {
        let now = time::OffsetDateTime::now_utc();
        let detail = ServiceDetail {
            service: Service {
                id: Uuid::new_v4(),
                name: "Deep Cleaning".into(),
                description: "Whole home".into(),
                category: "Cleaning".into(),
                average_price: 120.0,
                created_at: now,
                updated_at: now,
            },
            providers: vec![],
            provider_count: 0,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Deep Cleaning");
        assert_eq!(json["averagePrice"], 120.0);
        assert_eq!(json["providerCount"], 0);
    }
}
