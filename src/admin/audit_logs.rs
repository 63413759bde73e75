use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    audit::{self, AuditLogView},
    auth::AdminUser,
    error::ApiResult,
    pagination::{Page, Paginated},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditLogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/audit/logs", get(list_logs))
}

/// Newest first, with the acting admin's name and email when known.
#[instrument(skip(state, _admin))]
pub async fn list_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<AuditLogQuery>,
) -> ApiResult<Json<Paginated<AuditLogView>>> {
    let page = Page::new(q.page, q.limit, 20);
    let (logs, total) = tokio::try_join!(
        audit::list(&state.db, page.limit, page.offset()),
        audit::count(&state.db),
    )?;
    Ok(Json(Paginated::new(logs, page, total)))
}
