use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    state::AppState,
};

const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
        .route(
            "/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 16 * 1024)),
        )
}

#[derive(Deserialize)]
struct ProfilePayload {
    name: String,
    email: String,
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<ProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let name = payload.name.trim();
    let email = payload.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest("Name and email are required".into()));
    }

    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
        .bind(email)
        .bind(user.id)
        .fetch_one(&state.db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict("Email is already taken".into()));
    }

    sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
        .bind(name)
        .bind(email)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    let updated = auth::fetch_user_by_id(&state, user.id).await?;
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": updated.public(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordPayload {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<PasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let authed = current.require_user()?;
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Current password and new password are required".into(),
        ));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let user = auth::fetch_user_by_id(&state, authed.id).await?;
    if !auth::verify_password(&user.password_hash, &payload.current_password) {
        return Err(AppError::Unauthorized);
    }

    let password_hash = auth::hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn upload_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("invalid upload: {err}")))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest("File must be an image".into()));
        }
        let extension = field
            .file_name()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or("png")
            .to_ascii_lowercase();
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(format!("invalid upload: {err}")))?;
        upload = Some((extension, data));
        break;
    }

    let Some((extension, data)) = upload else {
        return Err(AppError::BadRequest("No file uploaded".into()));
    };
    if data.len() > MAX_AVATAR_BYTES {
        return Err(AppError::BadRequest(
            "File size must be less than 5MB".into(),
        ));
    }

    let avatar = state.storage.save_avatar(&extension, &data).await?;
    sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
        .bind(&avatar)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "message": "Avatar uploaded successfully",
        "avatar": avatar,
    })))
}
