use anyhow::Context;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        password::hash_password_blocking,
        repo::{self as auth_repo, NewAccount},
        services::{is_valid_email, normalize_email},
    },
    config::AdminSeed,
    db::UserType,
};

/// Creates the configured admin unless the email is already taken.
/// Returns whether an account was created.
pub async fn ensure_admin(db: &PgPool, seed: &AdminSeed) -> anyhow::Result<bool> {
    let email = normalize_email(&seed.email);
    if !is_valid_email(&email) {
        warn!(%email, "ADMIN_EMAIL is not a valid address; skipping admin seed");
        return Ok(false);
    }

    if let Some(existing) = auth_repo::find_by_email(db, &email).await? {
        if existing.user_type != UserType::Admin {
            warn!(%email, "ADMIN_EMAIL belongs to a non-admin account; skipping admin seed");
        } else {
            debug!(%email, "admin account already present");
        }
        return Ok(false);
    }

    let password_hash = hash_password_blocking(seed.password.clone())
        .await
        .context("hash seed admin password")?;
    let user = auth_repo::create_account(
        db,
        NewAccount {
            first_name: seed.first_name.trim(),
            last_name: seed.last_name.trim(),
            email: &email,
            password_hash: &password_hash,
            phone: None,
            user_type: UserType::Admin,
        },
    )
    .await
    .context("create seed admin")?;

    info!(user_id = %user.id, %email, "seed admin created");
    Ok(true)
}
