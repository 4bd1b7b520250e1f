use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::aggregator::{compute_stats, Stats};
use crate::{
    auth::services::AuthUser,
    config::STATS_WINDOW_RANGE,
    error::{AppError, AppResult},
    schedules::generator::today,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub window_days: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<StatsQuery>,
) -> AppResult<Json<Stats>> {
    let window_days = match q.window_days {
        None => state.config.stats_window_days,
        Some(d) if STATS_WINDOW_RANGE.contains(&d) => d,
        Some(_) => {
            return Err(AppError::validation(
                "window_days must be between 1 and 3650",
            ))
        }
    };
    let stats = compute_stats(state.store.as_ref(), user_id, today(), window_days).await?;
    Ok(Json(stats))
}
