//! Queries behind the admin console: user management and the aggregates
//! used by the dashboard and analytics screens.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{contains_pattern, User, UserType, USER_COLUMNS};

// Users.

const USER_FILTER: &str = "is_active \
     AND ($1::user_type IS NULL OR user_type = $1) \
     AND ($2::text IS NULL OR first_name ILIKE $2 ESCAPE '\\' OR last_name ILIKE $2 ESCAPE '\\' OR email ILIKE $2 ESCAPE '\\')";

pub async fn list_users(
    db: &PgPool,
    user_type: Option<UserType>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {USER_FILTER} \
          ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(user_type)
    .bind(search.map(contains_pattern))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_users(
    db: &PgPool,
    user_type: Option<UserType>,
    search: Option<&str>,
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users WHERE {USER_FILTER}"))
        .bind(user_type)
        .bind(search.map(contains_pattern))
        .fetch_one(db)
        .await
}

#[derive(Debug, FromRow)]
pub struct CustomerMeta {
    pub customer_id: Uuid,
    pub booking_count: i64,
}

pub async fn customer_meta(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<CustomerMeta>> {
    sqlx::query_as::<_, CustomerMeta>(
        r#"
        SELECT c.id AS customer_id,
               (SELECT COUNT(*) FROM bookings b WHERE b.customer_id = c.id) AS booking_count
          FROM customers c
         WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

#[derive(Debug, FromRow)]
pub struct ProviderMeta {
    pub provider_id: Uuid,
    pub verified: bool,
    pub verification_requested: bool,
    pub rating: f64,
    pub service_count: i64,
    pub booking_count: i64,
}

pub async fn provider_meta(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<ProviderMeta>> {
    sqlx::query_as::<_, ProviderMeta>(
        r#"
        SELECT p.id AS provider_id, p.verified, p.verification_requested, p.rating,
               (SELECT COUNT(*) FROM provider_services ps WHERE ps.provider_id = p.id) AS service_count,
               (SELECT COUNT(*) FROM bookings b WHERE b.provider_id = p.id) AS booking_count
          FROM providers p
         WHERE p.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub struct UserPatch<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
}

pub async fn update_user(db: &PgPool, id: Uuid, patch: UserPatch<'_>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
           SET first_name = COALESCE($2, first_name),
               last_name  = COALESCE($3, last_name),
               email      = COALESCE($4, email),
               phone      = COALESCE($5, phone),
               updated_at = now()
         WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.first_name)
    .bind(patch.last_name)
    .bind(patch.email)
    .bind(patch.phone)
    .fetch_one(db)
    .await
}

pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(active)
    .fetch_one(db)
    .await
}

/// Cascades to the customer/provider/admin row and their bookings.
pub async fn delete_user(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Dashboard counters.

pub async fn count_active_members(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE is_active AND user_type IN ('CUSTOMER', 'PROVIDER')",
    )
    .fetch_one(db)
    .await
}

pub async fn count_verified_providers(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM providers WHERE verified")
        .fetch_one(db)
        .await
}

pub async fn count_active_bookings(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE status IN ('PENDING', 'CONFIRMED', 'IN_PROGRESS')",
    )
    .fetch_one(db)
    .await
}

pub async fn count_completed_since(db: &PgPool, since: OffsetDateTime) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE status = 'COMPLETED' AND updated_at >= $1",
    )
    .bind(since)
    .fetch_one(db)
    .await
}

/// Completed or cancelled since the cutoff.
pub async fn count_closed_since(db: &PgPool, since: OffsetDateTime) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE status IN ('COMPLETED', 'CANCELLED') AND updated_at >= $1",
    )
    .bind(since)
    .fetch_one(db)
    .await
}

pub async fn count_pending_verifications(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM providers WHERE verification_requested AND NOT verified",
    )
    .fetch_one(db)
    .await
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

/// Customer and provider sign-ups per UTC day.
pub async fn registrations_per_day(db: &PgPool, since: OffsetDateTime) -> sqlx::Result<Vec<DayCount>> {
    sqlx::query_as::<_, DayCount>(
        r#"
        SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date, COUNT(*) AS count
          FROM users
         WHERE created_at >= $1 AND user_type IN ('CUSTOMER', 'PROVIDER')
         GROUP BY 1
         ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await
}

// Analytics.

#[derive(Debug, Clone, Copy, FromRow)]
pub struct UserTotals {
    pub users: i64,
    pub providers: i64,
    pub customers: i64,
}

pub async fn user_totals(db: &PgPool) -> sqlx::Result<UserTotals> {
    sqlx::query_as::<_, UserTotals>(
        r#"
        SELECT COUNT(*) AS users,
               COUNT(*) FILTER (WHERE user_type = 'PROVIDER') AS providers,
               COUNT(*) FILTER (WHERE user_type = 'CUSTOMER') AS customers
          FROM users
        "#,
    )
    .fetch_one(db)
    .await
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct BookingTotals {
    pub bookings: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub revenue: f64,
}

pub async fn booking_totals(db: &PgPool) -> sqlx::Result<BookingTotals> {
    sqlx::query_as::<_, BookingTotals>(
        r#"
        SELECT COUNT(*) AS bookings,
               COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
               COUNT(*) FILTER (WHERE status = 'CANCELLED') AS cancelled,
               COALESCE(SUM(total_price), 0)::float8 AS revenue
          FROM bookings
        "#,
    )
    .fetch_one(db)
    .await
}

/// Every user sign-up per UTC day, admins included.
pub async fn all_registrations_per_day(
    db: &PgPool,
    since: OffsetDateTime,
) -> sqlx::Result<Vec<DayCount>> {
    sqlx::query_as::<_, DayCount>(
        r#"
        SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date, COUNT(*) AS count
          FROM users
         WHERE created_at >= $1
         GROUP BY 1
         ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingDay {
    pub date: String,
    pub total: i64,
    pub completed: i64,
    pub revenue: f64,
}

/// Bookings created per UTC day; revenue counts completed bookings only.
pub async fn bookings_per_day(db: &PgPool, since: OffsetDateTime) -> sqlx::Result<Vec<BookingDay>> {
    sqlx::query_as::<_, BookingDay>(
        r#"
        SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
               COALESCE(SUM(total_price) FILTER (WHERE status = 'COMPLETED'), 0)::float8 AS revenue
          FROM bookings
         WHERE created_at >= $1
         GROUP BY 1
         ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueItem {
    pub id: Uuid,
    pub total_price: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Completed bookings whose last update falls inside `[from, to]`.
pub async fn completed_between(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> sqlx::Result<Vec<RevenueItem>> {
    sqlx::query_as::<_, RevenueItem>(
        r#"
        SELECT id, total_price, updated_at
          FROM bookings
         WHERE status = 'COMPLETED' AND updated_at BETWEEN $1 AND $2
         ORDER BY updated_at DESC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
}
