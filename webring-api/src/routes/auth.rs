/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Open a session
/// - `POST /v1/auth/logout` - Close the current session

use crate::{
    app::{AppState, AuthUser},
    error::ApiResult,
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use webring_shared::models::user::User;

/// Register request
///
/// Format rules (username charset, email syntax, password strength) are
/// enforced by the user service; only presence is checked here.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,

    pub expires_at: DateTime<Utc>,

    pub user: User,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "Str0ngPass!"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the new user (`id`, `username`, `email`, `created_at`,
/// `updated_at`). A registration email is sent in the background.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid username, email or password
/// - `409 Conflict`: `email_not_unique` or `username_not_unique`
/// - `422 Unprocessable Entity`: Missing fields
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = state
        .users
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "identifier": "alice",
///   "password": "Str0ngPass!"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "...",
///   "expires_at": "2024-01-08T00:00:00Z",
///   "user": { "id": "uuid", "username": "alice", ... }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `422 Unprocessable Entity`: Missing fields
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let login = state
        .users
        .login(&req.identifier, &req.password)
        .await?;

    Ok(Json(LoginResponse {
        token: login.token,
        expires_at: login.session.expires_at,
        user: login.user,
    }))
}

/// Logout endpoint
///
/// Ends the session the request was authenticated with.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    state.users.logout(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
