use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::AuditEntry;

pub(super) async fn insert(db: &PgPool, entry: &AuditEntry) -> sqlx::Result<()> {
    let details = (!entry.details.is_null()).then_some(&entry.details);
    sqlx::query(
        r#"
        INSERT INTO audit_logs (admin_id, action, target_type, target_id, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(entry.admin_id)
    .bind(entry.action.as_str())
    .bind(entry.target_type.as_str())
    .bind(entry.target_id)
    .bind(details)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    action: String,
    target_type: String,
    target_id: Option<Uuid>,
    details: Option<serde_json::Value>,
    created_at: OffsetDateTime,
    admin_first_name: Option<String>,
    admin_last_name: Option<String>,
    admin_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditAdmin {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogView {
    pub id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub admin: Option<AuditAdmin>,
}

impl From<AuditRow> for AuditLogView {
    fn from(r: AuditRow) -> Self {
        let admin = match (r.admin_first_name, r.admin_last_name, r.admin_email) {
            (Some(first), Some(last), Some(email)) => Some(AuditAdmin {
                name: format!("{first} {last}"),
                email,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            action: r.action,
            target_type: r.target_type,
            target_id: r.target_id,
            details: r.details,
            created_at: r.created_at,
            admin,
        }
    }
}

/// Newest first, with the acting admin's name when still known.
pub async fn list(db: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<AuditLogView>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT l.id, l.action, l.target_type, l.target_id, l.details, l.created_at,
               u.first_name AS admin_first_name,
               u.last_name  AS admin_last_name,
               u.email      AS admin_email
          FROM audit_logs l
          LEFT JOIN admins a ON a.id = l.admin_id
          LEFT JOIN users  u ON u.id = a.user_id
         ORDER BY l.created_at DESC
         LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(AuditLogView::from).collect())
}

pub async fn recent(db: &PgPool, limit: i64) -> sqlx::Result<Vec<AuditLogView>> {
    list(db, limit, 0).await
}

pub async fn count(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs")
        .fetch_one(db)
        .await
}
