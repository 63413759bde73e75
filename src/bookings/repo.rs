use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::scope::Scope;
use crate::db::{qualified, Booking, BookingStatus, Customer, BOOKING_COLUMNS};

pub async fn find_customer_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Customer>> {
    sqlx::query_as::<_, Customer>("SELECT id, user_id, created_at FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn list_for_customer(db: &PgPool, customer_id: Uuid) -> sqlx::Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC"
    ))
    .bind(customer_id)
    .fetch_all(db)
    .await
}

pub async fn list_for_provider(db: &PgPool, provider_id: Uuid) -> sqlx::Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE provider_id = $1 ORDER BY created_at DESC"
    ))
    .bind(provider_id)
    .fetch_all(db)
    .await
}

/// Booking with the names a list screen shows next to it.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub service_name: String,
    pub provider_name: String,
    pub customer_name: String,
}

fn select_view() -> String {
    format!(
        "SELECT {}, s.name AS service_name, \
                pu.first_name || ' ' || pu.last_name AS provider_name, \
                cu.first_name || ' ' || cu.last_name AS customer_name \
           FROM bookings b \
           JOIN services  s  ON s.id  = b.service_id \
           JOIN providers p  ON p.id  = b.provider_id \
           JOIN users     pu ON pu.id = p.user_id \
           JOIN customers c  ON c.id  = b.customer_id \
           JOIN users     cu ON cu.id = c.user_id",
        qualified(BOOKING_COLUMNS, "b")
    )
}

/// Newest first, restricted to what the scope may see.
pub async fn list_visible(db: &PgPool, scope: Scope) -> sqlx::Result<Vec<BookingView>> {
    let Some((customer_id, provider_id)) = scope.filters() else {
        return Ok(Vec::new());
    };
    sqlx::query_as::<_, BookingView>(&format!(
        "{} WHERE ($1::uuid IS NULL OR b.customer_id = $1) \
            AND ($2::uuid IS NULL OR b.provider_id = $2) \
          ORDER BY b.created_at DESC",
        select_view()
    ))
    .bind(customer_id)
    .bind(provider_id)
    .fetch_all(db)
    .await
}

pub async fn find_view(db: &PgPool, id: Uuid) -> sqlx::Result<Option<BookingView>> {
    sqlx::query_as::<_, BookingView>(&format!("{} WHERE b.id = $1", select_view()))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub struct NewBooking<'a> {
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub scheduled_date: OffsetDateTime,
    pub scheduled_time: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub total_price: Option<f64>,
}

pub async fn create(db: &PgPool, new: NewBooking<'_>) -> sqlx::Result<Booking> {
    sqlx::query_as::<_, Booking>(&format!(
        r#"
        INSERT INTO bookings
            (customer_id, provider_id, service_id, scheduled_date, scheduled_time, notes, total_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(new.customer_id)
    .bind(new.provider_id)
    .bind(new.service_id)
    .bind(new.scheduled_date)
    .bind(new.scheduled_time)
    .bind(new.notes)
    .bind(new.total_price)
    .fetch_one(db)
    .await
}

pub async fn update_status(db: &PgPool, id: Uuid, status: BookingStatus) -> sqlx::Result<Booking> {
    sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_one(db)
    .await
}
