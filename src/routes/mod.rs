pub mod auth;
pub mod profile;
pub mod trips;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;

use crate::{realtime::socket, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/trips", trips::router())
        .nest("/api/user", profile::router())
        .route("/ws", get(socket::ws_handler))
        .nest_service("/avatars", ServeDir::new(state.config.avatar_root.clone()))
        .with_state(state)
}
