use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    repo::{self, BookingView, NewBooking},
    scope::Scope,
};
use crate::{
    auth::AuthUser,
    catalog,
    dates::parse_instant,
    db::{Booking, BookingStatus, UserType},
    error::{ApiError, ApiResult},
    providers,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBookingRequest {
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date: String,
    pub time: Option<String>,
    pub notes: Option<String>,
    pub total_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BookingMessage {
    pub message: &'static str,
    pub booking: Booking,
}

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/status", put(update_status))
}

#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingMessage>)> {
    if auth.role != UserType::Customer {
        return Err(ApiError::forbidden("Customer access required"));
    }
    let (Some(provider_id), Some(service_id)) = (payload.provider_id, payload.service_id) else {
        return Err(ApiError::validation("Provider, service and date are required"));
    };
    let scheduled_date = parse_instant(&payload.date)
        .ok_or_else(|| ApiError::validation("Please provide a valid booking date"))?;
    if payload.total_price.is_some_and(|p| p < 0.0) {
        return Err(ApiError::validation("Total price must be a positive number"));
    }

    let customer = repo::find_customer_by_user(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::validation("Customer profile not found"))?;
    if providers::repo::find_by_id(&state.db, provider_id).await?.is_none() {
        return Err(ApiError::not_found("Provider not found"));
    }
    let service = catalog::repo::find_by_id(&state.db, service_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let booking = repo::create(
        &state.db,
        NewBooking {
            customer_id: customer.id,
            provider_id,
            service_id,
            scheduled_date,
            scheduled_time: payload.time.as_deref().map(str::trim).filter(|t| !t.is_empty()),
            notes: payload.notes.as_deref(),
            total_price: Some(payload.total_price.unwrap_or(service.average_price)),
        },
    )
    .await?;

    info!(booking_id = %booking.id, customer_id = %customer.id, %provider_id, "booking created");
    Ok((
        StatusCode::CREATED,
        Json(BookingMessage {
            message: "Booking created successfully",
            booking,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<BookingView>>> {
    let scope = Scope::resolve(&state.db, &auth).await?;
    Ok(Json(repo::list_visible(&state.db, scope).await?))
}

#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BookingView>> {
    let scope = Scope::resolve(&state.db, &auth).await?;
    match repo::find_view(&state.db, id).await? {
        Some(view) if scope.can_view(&view.booking) => Ok(Json(view)),
        _ => Err(ApiError::not_found("Booking not found")),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<BookingMessage>> {
    let status = BookingStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::validation("Invalid booking status"))?;

    let scope = Scope::resolve(&state.db, &auth).await?;
    let current = match repo::find_by_id(&state.db, id).await? {
        Some(b) if scope.can_view(&b) => b,
        _ => return Err(ApiError::not_found("Booking not found")),
    };

    let booking = repo::update_status(&state.db, id, status).await?;
    info!(booking_id = %id, from = ?current.status, to = ?booking.status, "booking status updated");
    Ok(Json(BookingMessage {
        message: "Booking status updated successfully",
        booking,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{access_token, bearer};
    use axum::http::header::AUTHORIZATION;
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> (TestServer, AppState) {
        let state = AppState::fake();
        let server = TestServer::new(booking_routes().with_state(state.clone())).unwrap();
        (server, state)
    }

    #[tokio::test]
    async fn only_customers_create_bookings() {
        let (server, state) = server();
        let token = access_token(&state, UserType::Provider);
        let res = server
            .post("/bookings")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "providerId": Uuid::new_v4(),
                "serviceId": Uuid::new_v4(),
                "date": "2024-06-01"
            }))
            .await;
        res.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn create_rejects_bad_date() {
        let (server, state) = server();
        let token = access_token(&state, UserType::Customer);
        let res = server
            .post("/bookings")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "providerId": Uuid::new_v4(),
                "serviceId": Uuid::new_v4(),
                "date": "sometime soon"
            }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json();
        assert_eq!(body["message"], "Please provide a valid booking date");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let (server, state) = server();
        let token = access_token(&state, UserType::Customer);
        let res = server
            .put(&format!("/bookings/{}/status", Uuid::new_v4()))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "status": "ON_HOLD" }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_requires_token() {
        let (server, _) = server();
        server.get("/bookings").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
