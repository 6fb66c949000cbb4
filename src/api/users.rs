use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::api::AppState;
use crate::domain::{Money, UserAccount};
use crate::error::{AppError, FieldError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub balance: Money,
    pub initial_balance: Money,
    pub created_at: i64,
}

impl From<UserAccount> for UserDto {
    fn from(user: UserAccount) -> Self {
        UserDto {
            id: user.id.as_i64(),
            username: user.username,
            balance: user.balance,
            initial_balance: user.initial_balance,
            created_at: user.created_at.as_i64(),
        }
    }
}

/// Create an account funded with the fixed onboarding grant.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let username = req.username.unwrap_or_default();
    if username.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "username",
            "Username is required",
        )]));
    }

    let user = state.repo.insert_user(username.trim()).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully",
            "user": UserDto::from(user),
        })),
    ))
}

/// Current account, including balance and the registration-time baseline.
pub async fn me(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(serde_json::json!({ "user": UserDto::from(user) })))
}
