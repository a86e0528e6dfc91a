use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use chrono::{Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        reset::ResetToken,
        session::Session,
        user::{User, DEFAULT_AVATAR},
    },
    state::AppState,
};

pub const SESSION_COOKIE: &str = "flowroute_session";

const SESSION_TTL_DAYS: i64 = 7;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, FromRow)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar = match PrivateCookieJar::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(err) => match err {},
        };

        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };

        Ok(Self(session_user(state, cookie.value()).await?))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

/// Resolve a session id to its user. Expired sessions count as absent.
async fn session_user(
    state: &AppState,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let user = sqlx::query_as::<_, AuthenticatedUser>(
        "SELECT u.id, u.uuid, u.name, u.email, u.avatar
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.id = ? AND s.expires_at > ?",
    )
    .bind(session_id)
    .bind(Utc::now())
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&state.db)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(password)?;
    let uuid = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (uuid, name, email, password_hash, avatar, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&uuid)
    .bind(name)
    .bind(email)
    .bind(&password_hash)
    .bind(DEFAULT_AVATAR)
    .bind(Utc::now())
    .execute(&state.db)
    .await?;

    fetch_user_by_uuid(state, &uuid).await
}

pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&user.password_hash, password) {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(user)
}

pub async fn fetch_user_by_id(state: &AppState, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn fetch_user_by_uuid(state: &AppState, uuid: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        created_at: now,
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
    };

    sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&state.db)
        .await?;

    Ok(session.id)
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Issue a one-hour reset token, or `None` when the address is unknown.
/// Callers decide what to reveal about unknown addresses.
pub async fn issue_reset_token(
    state: &AppState,
    email: &str,
) -> Result<Option<ResetToken>, AppError> {
    let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&state.db)
        .await?;
    if known == 0 {
        return Ok(None);
    }

    let now = Utc::now();
    let token = ResetToken {
        token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        email: email.to_string(),
        created_at: now,
        expires_at: now + Duration::hours(RESET_TOKEN_TTL_HOURS),
    };

    sqlx::query("INSERT INTO reset_tokens (token, email, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token.token)
        .bind(&token.email)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&state.db)
        .await?;

    Ok(Some(token))
}

pub async fn find_valid_reset_token(state: &AppState, token: &str) -> Result<ResetToken, AppError> {
    let reset = sqlx::query_as::<_, ResetToken>("SELECT * FROM reset_tokens WHERE token = ?")
        .bind(token)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".into()))?;

    if reset.is_expired() {
        return Err(AppError::BadRequest("Token has expired".into()));
    }
    Ok(reset)
}

/// Consume a reset token and set the new password. Returns the address the
/// token was issued for, so callers can send the confirmation mail.
pub async fn reset_password(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<String, AppError> {
    let reset = find_valid_reset_token(state, token).await?;

    let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(&reset.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)?;

    let password_hash = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    // Tokens are single-use.
    sqlx::query("DELETE FROM reset_tokens WHERE token = ?")
        .bind(token)
        .execute(&state.db)
        .await?;

    Ok(reset.email)
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    jar.remove(cookie)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow!("hash password: {err}")))
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
