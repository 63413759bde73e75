//! Helpers shared by the router tests.

use axum::{extract::FromRef, http::HeaderValue};
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, db::UserType, state::AppState};

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// Access token for a random user with the given role.
pub fn access_token(state: &AppState, role: UserType) -> String {
    JwtKeys::from_ref(state)
        .sign_access(Uuid::new_v4(), role)
        .unwrap()
}
