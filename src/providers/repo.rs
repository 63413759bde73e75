use std::collections::HashMap;

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::dto::{CreateProviderRequest, UpdateProviderRequest, UserSummary};
use crate::db::{contains_pattern, qualified, Provider, Service, PROVIDER_COLUMNS};

/// Provider joined with the owning user's contact fields.
#[derive(Debug, FromRow)]
pub struct ProviderRow {
    #[sqlx(flatten)]
    pub provider: Provider,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl ProviderRow {
    pub fn into_parts(self) -> (Provider, UserSummary) {
        let user = UserSummary {
            id: self.provider.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
        };
        (self.provider, user)
    }
}

fn select_with_user() -> String {
    format!(
        "SELECT {}, u.first_name, u.last_name, u.email, u.phone \
           FROM providers p JOIN users u ON u.id = p.user_id",
        qualified(PROVIDER_COLUMNS, "p")
    )
}

pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<ProviderRow>> {
    sqlx::query_as::<_, ProviderRow>(&format!(
        "{} WHERE u.is_active ORDER BY p.rating DESC, p.created_at DESC",
        select_with_user()
    ))
    .fetch_all(db)
    .await
}

pub async fn list_by_service(db: &PgPool, service_id: Uuid) -> sqlx::Result<Vec<ProviderRow>> {
    sqlx::query_as::<_, ProviderRow>(&format!(
        "{} JOIN provider_services ps ON ps.provider_id = p.id \
          WHERE ps.service_id = $1 AND u.is_active \
          ORDER BY p.rating DESC",
        select_with_user()
    ))
    .bind(service_id)
    .fetch_all(db)
    .await
}

pub async fn find_row_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<ProviderRow>> {
    sqlx::query_as::<_, ProviderRow>(&format!("{} WHERE p.id = $1", select_with_user()))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_row_by_user_id(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<ProviderRow>> {
    sqlx::query_as::<_, ProviderRow>(&format!("{} WHERE p.user_id = $1", select_with_user()))
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Provider>> {
    sqlx::query_as::<_, Provider>(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_user_id(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Provider>> {
    sqlx::query_as::<_, Provider>(&format!(
        "SELECT {PROVIDER_COLUMNS} FROM providers WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Inserts the provider row and links the requested services.
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateProviderRequest,
) -> sqlx::Result<Provider> {
    let mut tx = db.begin().await?;

    let provider = sqlx::query_as::<_, Provider>(&format!(
        r#"
        INSERT INTO providers (user_id, experience, location, hourly_rate, bio)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {PROVIDER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(req.experience.trim())
    .bind(req.location.trim())
    .bind(req.hourly_rate)
    .bind(req.bio.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    if !req.service_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO provider_services (provider_id, service_id)
            SELECT $1, s.id FROM services s WHERE s.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(provider.id)
        .bind(&req.service_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(provider)
}

pub async fn update(db: &PgPool, id: Uuid, req: &UpdateProviderRequest) -> sqlx::Result<Provider> {
    sqlx::query_as::<_, Provider>(&format!(
        r#"
        UPDATE providers
           SET experience  = COALESCE($2, experience),
               location    = COALESCE($3, location),
               hourly_rate = COALESCE($4, hourly_rate),
               bio         = COALESCE($5, bio),
               updated_at  = now()
         WHERE id = $1
        RETURNING {PROVIDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(req.experience.as_deref().map(str::trim))
    .bind(req.location.as_deref().map(str::trim))
    .bind(req.hourly_rate)
    .bind(req.bio.as_deref())
    .fetch_one(db)
    .await
}

pub async fn request_verification(db: &PgPool, id: Uuid) -> sqlx::Result<Provider> {
    sqlx::query_as::<_, Provider>(&format!(
        r#"
        UPDATE providers
           SET verification_requested = TRUE,
               verification_requested_at = now(),
               updated_at = now()
         WHERE id = $1
        RETURNING {PROVIDER_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn mark_verified(db: &PgPool, id: Uuid, verified_by: Uuid) -> sqlx::Result<Provider> {
    sqlx::query_as::<_, Provider>(&format!(
        r#"
        UPDATE providers
           SET verified = TRUE,
               verified_at = now(),
               verified_by = $2,
               verification_rejected_reason = NULL,
               updated_at = now()
         WHERE id = $1
        RETURNING {PROVIDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(verified_by)
    .fetch_one(db)
    .await
}

pub async fn mark_rejected(db: &PgPool, id: Uuid, reason: &str) -> sqlx::Result<Provider> {
    sqlx::query_as::<_, Provider>(&format!(
        r#"
        UPDATE providers
           SET verification_requested = FALSE,
               verification_rejected_reason = $2,
               verified = FALSE,
               verified_at = NULL,
               verified_by = NULL,
               updated_at = now()
         WHERE id = $1
        RETURNING {PROVIDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(reason)
    .fetch_one(db)
    .await
}

/// Pending verification queue entry.
#[derive(Debug, FromRow)]
pub struct PendingRow {
    #[sqlx(flatten)]
    pub provider: ProviderRow,
    pub total_services: i64,
}

const PENDING_FILTER: &str = "p.verification_requested AND NOT p.verified \
     AND ($1::text IS NULL OR u.first_name ILIKE $1 ESCAPE '\\' OR u.last_name ILIKE $1 ESCAPE '\\' \
          OR u.email ILIKE $1 ESCAPE '\\' OR p.location ILIKE $1 ESCAPE '\\')";

/// Oldest request first so the queue is worked in order.
pub async fn list_pending(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<PendingRow>> {
    sqlx::query_as::<_, PendingRow>(&format!(
        "SELECT {}, u.first_name, u.last_name, u.email, u.phone, \
                (SELECT COUNT(*) FROM provider_services ps WHERE ps.provider_id = p.id) AS total_services \
           FROM providers p JOIN users u ON u.id = p.user_id \
          WHERE {PENDING_FILTER} \
          ORDER BY p.verification_requested_at ASC NULLS LAST \
          LIMIT $2 OFFSET $3",
        qualified(PROVIDER_COLUMNS, "p")
    ))
    .bind(search.map(contains_pattern))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_pending(db: &PgPool, search: Option<&str>) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM providers p JOIN users u ON u.id = p.user_id WHERE {PENDING_FILTER}"
    ))
    .bind(search.map(contains_pattern))
    .fetch_one(db)
    .await
}

/// Splits joined rows and attaches each provider's services.
pub fn assemble<T>(
    rows: Vec<ProviderRow>,
    mut services: HashMap<Uuid, Vec<Service>>,
    build: impl Fn(Provider, UserSummary, Vec<Service>) -> T,
) -> Vec<T> {
    rows.into_iter()
        .map(|row| {
            let (provider, user) = row.into_parts();
            let offered = services.remove(&provider.id).unwrap_or_default();
            build(provider, user, offered)
        })
        .collect()
}
