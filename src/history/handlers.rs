use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{HistoryQuery, RecordDoseRequest},
    repo_types::{HistoryEntry, HistoryRecord},
    services,
};
use crate::{auth::services::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/history", get(list_history).post(record_dose))
}

#[instrument(skip(state))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(
        services::list_history(state.store.as_ref(), user_id, q).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn record_dose(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<RecordDoseRequest>,
) -> AppResult<(StatusCode, Json<HistoryRecord>)> {
    let record = services::record_dose(state.store.as_ref(), user_id, body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
