mod admin;
mod app;
mod audit;
mod auth;
mod bookings;
mod catalog;
mod config;
mod dates;
mod db;
mod error;
mod pagination;
mod providers;
mod state;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "localnest=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    if let Some(seed) = app_state.config.admin_seed.as_ref() {
        if let Err(e) = admin::bootstrap::ensure_admin(&app_state.db, seed).await {
            tracing::warn!(error = %e, "admin seed failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}
