use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod verification;

pub(crate) use handlers::{ensure_owner, load_views};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::provider_routes())
}
