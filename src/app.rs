use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{admin, auth, bookings, catalog, error::route_not_found, providers, state::AppState};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(providers::router())
        .merge(catalog::router())
        .merge(bookings::router())
        .merge(admin::router())
        .route("/health", get(health))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn server() -> TestServer {
        TestServer::new(build_app(AppState::fake())).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = server().get("/api/health").await;
        res.assert_status_ok();
        res.assert_json(&json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn unknown_route_is_404_with_path() {
        let res = server().get("/api/nope").await;
        res.assert_status(StatusCode::NOT_FOUND);
        let body: Value = res.json();
        assert_eq!(body["message"], "Route /api/nope not found");
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn modules_are_mounted_under_api() {
        let server = server();
        server
            .get("/api/admin/dashboard/stats")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/bookings")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
