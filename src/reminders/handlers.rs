use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateReminderRequest, UpdateReminderRequest},
    repo_types::{Reminder, ReminderEntry},
    services,
};
use crate::{auth::services::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list_reminders).post(create_reminder))
        .route("/reminders/:id", put(update_reminder).delete(delete_reminder))
}

#[instrument(skip(state, body))]
pub async fn create_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateReminderRequest>,
) -> AppResult<(StatusCode, Json<Reminder>)> {
    let reminder = services::create_reminder(state.store.as_ref(), user_id, body).await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

#[instrument(skip(state))]
pub async fn list_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ReminderEntry>>> {
    Ok(Json(
        services::list_reminders(state.store.as_ref(), user_id).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn update_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateReminderRequest>,
) -> AppResult<Json<Reminder>> {
    Ok(Json(
        services::update_reminder(state.store.as_ref(), user_id, id, body).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete_reminder(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
