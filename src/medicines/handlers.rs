use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateMedicineRequest, CreatedMedicineResponse, UpdateMedicineRequest},
    repo_types::Medicine,
    services,
};
use crate::{
    auth::services::AuthUser, error::AppResult, schedules::generator::today, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/medicines", get(list_medicines).post(create_medicine))
        .route(
            "/medicines/:id",
            get(get_medicine).put(update_medicine).delete(delete_medicine),
        )
}

#[instrument(skip(state, body))]
pub async fn create_medicine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMedicineRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<CreatedMedicineResponse>)> {
    let created = services::create_medicine(state.store.as_ref(), user_id, body, today()).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/medicines/{}", created.medicine.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(created)))
}

#[instrument(skip(state))]
pub async fn list_medicines(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Medicine>>> {
    Ok(Json(
        services::list_medicines(state.store.as_ref(), user_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_medicine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Medicine>> {
    Ok(Json(
        services::get_medicine(state.store.as_ref(), user_id, id).await?,
    ))
}

#[instrument(skip(state, body))]
pub async fn update_medicine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMedicineRequest>,
) -> AppResult<Json<Medicine>> {
    Ok(Json(
        services::update_medicine(state.store.as_ref(), user_id, id, body).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_medicine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete_medicine(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
