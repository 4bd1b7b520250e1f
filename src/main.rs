use std::sync::Arc;

mod app;
mod auth;
mod config;
mod error;
mod formats;
mod history;
mod medicines;
mod reminders;
mod schedules;
mod state;
mod stats;
mod store;
#[cfg(test)]
mod test_support;

use crate::{config::AppConfig, state::AppState, store::PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "medtrack=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    let store = Arc::new(PgStore::connect(&config).await?);

    if let Err(e) = store.migrate().await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let state = AppState::from_parts(store.clone(), Arc::new(config));
    let result = app::serve(app::build_app(state)).await;

    store.close().await;
    result
}
