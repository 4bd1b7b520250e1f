use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{dto::MarkTakenResponse, generator::today, repo_types::ScheduleEntry, services};
use crate::{auth::services::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/schedules", get(list_schedules))
        .route("/schedules/today", get(todays_schedule))
        .route("/schedules/:id/taken", put(mark_taken))
}

#[instrument(skip(state))]
pub async fn list_schedules(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ScheduleEntry>>> {
    Ok(Json(
        services::list_schedules(state.store.as_ref(), user_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn todays_schedule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ScheduleEntry>>> {
    Ok(Json(
        services::schedule_for_day(state.store.as_ref(), user_id, today()).await?,
    ))
}

#[instrument(skip(state))]
pub async fn mark_taken(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MarkTakenResponse>> {
    Ok(Json(
        services::mark_taken(state.store.as_ref(), user_id, id).await?,
    ))
}
