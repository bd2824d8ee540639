//! Registration and login: bind a username handle to a user row and issue a
//! session token. Credential verification is an external concern; what this
//! path guarantees is that authenticated handlers receive a typed principal.

use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::post};
use db::models::user::{User, UserRole};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<ResponseJson<ApiResponse<SessionResponse>>, ApiError> {
    let pool = &state.db().pool;
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".to_string()));
    }
    if User::find_by_username(pool, username).await?.is_some() {
        return Err(ApiError::BadRequest("username already taken".to_string()));
    }

    // The first registered user bootstraps board administration; everyone
    // after that is a plain member.
    let role = if User::count(pool).await? == 0 {
        UserRole::Admin
    } else {
        UserRole::Member
    };
    let user = User::create(pool, username, role).await?;
    let token = state.auth().issue_token(&user)?;
    tracing::info!(user_id = %user.id, username = %user.username, role = ?user.role, "user registered");

    Ok(ResponseJson(ApiResponse::success(SessionResponse {
        token,
        user,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<ResponseJson<ApiResponse<SessionResponse>>, ApiError> {
    let user = User::find_by_username(&state.db().pool, payload.username.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;
    let token = state.auth().issue_token(&user)?;

    Ok(ResponseJson(ApiResponse::success(SessionResponse {
        token,
        user,
    })))
}
