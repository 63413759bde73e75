use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::dto::UpdateProfileRequest;
use crate::db::{Admin, User, UserType, USER_COLUMNS};

/// Find a user by email.
pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub struct NewAccount<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub user_type: UserType,
}

/// Creates the user and its customer or provider row in one transaction.
pub async fn create_account(db: &PgPool, account: NewAccount<'_>) -> sqlx::Result<User> {
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, phone, user_type)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(account.first_name)
    .bind(account.last_name)
    .bind(account.email)
    .bind(account.password_hash)
    .bind(account.phone)
    .bind(account.user_type)
    .fetch_one(&mut *tx)
    .await?;

    match account.user_type {
        UserType::Customer => {
            sqlx::query("INSERT INTO customers (user_id) VALUES ($1)")
                .bind(user.id)
                .execute(&mut *tx)
                .await?;
        }
        UserType::Provider => {
            sqlx::query(
                "INSERT INTO providers (user_id, experience, location, hourly_rate) VALUES ($1, '', '', 0)",
            )
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        }
        UserType::Admin => {
            sqlx::query("INSERT INTO admins (user_id) VALUES ($1)")
                .bind(user.id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(user)
}

/// Updates the user's basic info and, for providers, the provider row.
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    req: &UpdateProfileRequest,
) -> sqlx::Result<User> {
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
           SET first_name = COALESCE($2, first_name),
               last_name  = COALESCE($3, last_name),
               phone      = COALESCE($4, phone),
               updated_at = now()
         WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(req.first_name.as_deref().map(str::trim))
    .bind(req.last_name.as_deref().map(str::trim))
    .bind(req.phone.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    if user.user_type == UserType::Provider {
        sqlx::query(
            r#"
            UPDATE providers
               SET experience  = COALESCE($2, experience),
                   location    = COALESCE($3, location),
                   hourly_rate = COALESCE($4, hourly_rate),
                   bio         = COALESCE($5, bio),
                   updated_at  = now()
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(req.experience.as_deref())
        .bind(req.location.as_deref())
        .bind(req.hourly_rate)
        .bind(req.bio.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(user)
}

#[derive(Debug, FromRow)]
pub struct AdminSession {
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub user_type: UserType,
}

/// Admin record joined with its user; `None` when the user has no admin row.
pub async fn find_admin_session(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<AdminSession>> {
    sqlx::query_as::<_, AdminSession>(
        r#"
        SELECT u.id AS user_id, a.id AS admin_id, u.email, u.is_active, u.user_type
          FROM users u
          JOIN admins a ON a.user_id = u.id
         WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Admin row of a user, if any.
pub async fn find_admin_id(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM admins WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn find_admin(db: &PgPool, admin_id: Uuid) -> sqlx::Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT id, user_id, created_at FROM admins WHERE id = $1")
        .bind(admin_id)
        .fetch_optional(db)
        .await
}
