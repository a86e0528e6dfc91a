use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-reset-token", get(verify_reset_token))
        .route("/reset-password", post(reset_password))
}

#[derive(Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }

    let user = auth::register_user(
        &state,
        payload.name.trim(),
        payload.email.trim(),
        &payload.password,
    )
    .await?;
    let session_id = auth::create_session(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(json!({
            "message": "User registered successfully",
            "user": user.public(),
        })),
    ))
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let user = auth::authenticate_user(&state, payload.email.trim(), &payload.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;

    Ok((
        auth::apply_session_cookie(jar, &session_id),
        Json(json!({
            "message": "Login successful",
            "user": user.public(),
        })),
    ))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((
        auth::clear_session_cookie(jar),
        Json(json!({ "message": "Logged out" })),
    ))
}

async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let authed = current.require_user()?;
    let user = auth::fetch_user_by_id(&state, authed.id).await?;
    Ok(Json(json!({ "user": user.public() })))
}

#[derive(Deserialize)]
struct ForgotPasswordPayload {
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    let Some(token) = auth::issue_reset_token(&state, email).await? else {
        // Do not reveal whether the address is registered.
        return Ok(Json(json!({
            "message": "If your email is registered, you will receive a password reset link",
        })));
    };

    let reset_url = format!("{}/reset-password/{}", state.config.public_url, token.token);
    state
        .mailer
        .send(
            email,
            "Reset Your Password",
            &format!(
                "You requested a password reset for your FlowRoute account.\n\
                 Open {reset_url} within the next hour to choose a new password.\n\
                 If you didn't request this, you can safely ignore this mail."
            ),
        )
        .await;

    Ok(Json(json!({
        "message": "Password reset link sent to your email",
    })))
}

#[derive(Deserialize)]
struct VerifyTokenQuery {
    token: Option<String>,
}

async fn verify_reset_token(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = query
        .token
        .ok_or_else(|| AppError::BadRequest("Token is required".into()))?;
    auth::find_valid_reset_token(&state, &token).await?;
    Ok(Json(json!({ "message": "Token is valid" })))
}

#[derive(Deserialize)]
struct ResetPasswordPayload {
    token: String,
    password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Token and password are required".into(),
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let email = auth::reset_password(&state, &payload.token, &payload.password).await?;

    state
        .mailer
        .send(
            &email,
            "Your Password Has Been Reset",
            "Your password for FlowRoute has been successfully reset.\n\
             If you did not request this change, please contact support immediately.",
        )
        .await;

    Ok(Json(json!({
        "message": "Password has been reset successfully",
    })))
}
