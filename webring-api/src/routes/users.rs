/// Current-user endpoints
///
/// - `GET /v1/users/me` - Profile of the authenticated user
/// - `PUT /v1/users/me` - Replace username and email

use crate::{
    app::{AppState, AuthUser},
    error::ApiResult,
    extract::ApiJson,
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use validator::Validate;
use webring_shared::models::user::User;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

pub async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<User> {
    Json(auth.user)
}

/// # Errors
///
/// - `400 Bad Request`: Invalid username or email
/// - `409 Conflict`: Username or email held by another user
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = state
        .users
        .update_user(auth.user.id, &req.username, &req.email)
        .await?;

    Ok(Json(user))
}
