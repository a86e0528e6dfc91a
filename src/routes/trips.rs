use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{NewTrip, ParticipantRef, Trip},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/:id", get(get_trip))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<NewTrip>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let driver = ParticipantRef {
        id: user.uuid.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
    };

    let trip = state.registry.create(input, driver).await;
    state.broadcaster.broadcast_trip_created(&trip).await;

    Ok((StatusCode::CREATED, Json(trip)))
}

async fn list_trips(State(state): State<AppState>) -> Json<Vec<Trip>> {
    Json(state.registry.list().await)
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.registry.get(&id).await?))
}
