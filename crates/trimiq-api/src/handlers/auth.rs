//! Registration and login handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use trimiq_models::RegisterUser;

use crate::auth::{hash_password, issue_token};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Registration response.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Register a new account with zeroed balance counters.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> ApiResult<Json<RegisterResponse>> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password);
    let user = state
        .db
        .create_user(&payload.username, &payload.email, &password_hash)
        .await?;

    info!(user_id = user.id, "User registered");

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
    }))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let password_hash = hash_password(&payload.password);
    let user = state
        .db
        .verify_credentials(&payload.email, &password_hash)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let access_token = issue_token(
        &user.username,
        &user.email,
        &state.config.secret_key,
        state.config.token_ttl_hours,
    )?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
