use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{contains_pattern, qualified, Service, SERVICE_COLUMNS};

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: Service,
    pub provider_count: i64,
}

pub async fn list_with_counts(db: &PgPool) -> sqlx::Result<Vec<ServiceWithCount>> {
    sqlx::query_as::<_, ServiceWithCount>(&format!(
        "SELECT {}, \
                (SELECT COUNT(*) FROM provider_services ps WHERE ps.service_id = s.id) AS provider_count \
           FROM services s ORDER BY s.category, s.name",
        qualified(SERVICE_COLUMNS, "s")
    ))
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Service>> {
    sqlx::query_as::<_, Service>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_for_provider(db: &PgPool, provider_id: Uuid) -> sqlx::Result<Vec<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        "SELECT {} FROM services s \
           JOIN provider_services ps ON ps.service_id = s.id \
          WHERE ps.provider_id = $1 ORDER BY s.name",
        qualified(SERVICE_COLUMNS, "s")
    ))
    .bind(provider_id)
    .fetch_all(db)
    .await
}

#[derive(Debug, FromRow)]
struct LinkedService {
    provider_id: Uuid,
    #[sqlx(flatten)]
    service: Service,
}

/// Services offered by each of the given providers, in one round trip.
pub async fn for_providers(
    db: &PgPool,
    provider_ids: &[Uuid],
) -> sqlx::Result<HashMap<Uuid, Vec<Service>>> {
    if provider_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, LinkedService>(&format!(
        "SELECT ps.provider_id, {} FROM provider_services ps \
           JOIN services s ON s.id = ps.service_id \
          WHERE ps.provider_id = ANY($1) ORDER BY s.name",
        qualified(SERVICE_COLUMNS, "s")
    ))
    .bind(provider_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<Service>> = HashMap::new();
    for row in rows {
        grouped.entry(row.provider_id).or_default().push(row.service);
    }
    Ok(grouped)
}

/// Returns false when the link already existed.
pub async fn link(db: &PgPool, provider_id: Uuid, service_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(
        "INSERT INTO provider_services (provider_id, service_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(provider_id)
    .bind(service_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn unlink(db: &PgPool, provider_id: Uuid, service_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM provider_services WHERE provider_id = $1 AND service_id = $2")
        .bind(provider_id)
        .bind(service_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Admin catalog management.

#[derive(Debug, Default)]
pub struct ServiceFilter<'a> {
    pub search: Option<&'a str>,
    pub category: Option<&'a str>,
}

const FILTER: &str = "($1::text IS NULL OR s.name ILIKE $1 ESCAPE '\\' OR s.description ILIKE $1 ESCAPE '\\' \
          OR s.category ILIKE $1 ESCAPE '\\') \
     AND ($2::text IS NULL OR lower(s.category) = lower($2))";

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminServiceRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: Service,
    pub provider_count: i64,
    pub booking_count: i64,
}

/// `order_by` must come from a whitelist; it is spliced into the SQL.
pub async fn list_page(
    db: &PgPool,
    filter: &ServiceFilter<'_>,
    order_by: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<AdminServiceRow>> {
    sqlx::query_as::<_, AdminServiceRow>(&format!(
        "SELECT {}, \
                (SELECT COUNT(*) FROM provider_services ps WHERE ps.service_id = s.id) AS provider_count, \
                (SELECT COUNT(*) FROM bookings b WHERE b.service_id = s.id) AS booking_count \
           FROM services s WHERE {FILTER} \
          ORDER BY {order_by} LIMIT $3 OFFSET $4",
        qualified(SERVICE_COLUMNS, "s")
    ))
    .bind(filter.search.map(contains_pattern))
    .bind(filter.category)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_filtered(db: &PgPool, filter: &ServiceFilter<'_>) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM services s WHERE {FILTER}"))
        .bind(filter.search.map(contains_pattern))
        .bind(filter.category)
        .fetch_one(db)
        .await
}

pub struct ServiceFields<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub average_price: f64,
}

pub async fn create(db: &PgPool, fields: ServiceFields<'_>) -> sqlx::Result<Service> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        INSERT INTO services (name, description, category, average_price)
        VALUES ($1, $2, $3, $4)
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.category)
    .bind(fields.average_price)
    .fetch_one(db)
    .await
}

pub struct ServicePatch<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub average_price: Option<f64>,
}

pub async fn update(db: &PgPool, id: Uuid, patch: ServicePatch<'_>) -> sqlx::Result<Option<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        UPDATE services
           SET name          = COALESCE($2, name),
               description   = COALESCE($3, description),
               category      = COALESCE($4, category),
               average_price = COALESCE($5, average_price),
               updated_at    = now()
         WHERE id = $1
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.name)
    .bind(patch.description)
    .bind(patch.category)
    .bind(patch.average_price)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn count_bookings(db: &PgPool, service_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE service_id = $1")
        .bind(service_id)
        .fetch_one(db)
        .await
}

pub async fn categories(db: &PgPool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM services ORDER BY category")
        .fetch_all(db)
        .await
}

/// Moves every service of one category to another; returns the number moved.
pub async fn rename_category(db: &PgPool, from: &str, to: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("UPDATE services SET category = $2, updated_at = now() WHERE category = $1")
        .bind(from)
        .bind(to)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
