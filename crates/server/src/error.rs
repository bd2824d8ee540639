//! API error taxonomy and its HTTP mapping.
//!
//! Write-path errors (conflict, not-found, store) surface here and reach
//! the requester; fanout-path errors never do, they are logged where they
//! happen because the write has already committed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::task::Task;
use services::services::{auth::AuthError, sync::MoveError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // A conflict must be distinguishable from a generic failure and
            // carries the current snapshot so the caller can refetch-free
            // reconcile and retry.
            ApiError::Move(MoveError::Conflict(current)) => (
                StatusCode::CONFLICT,
                Json(ApiResponse::<Task>::error_with_data(
                    "task was modified by another viewer, refresh and retry",
                    current,
                )),
            )
                .into_response(),
            ApiError::Move(MoveError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("task not found")),
            )
                .into_response(),
            ApiError::Move(MoveError::Store(e)) => {
                tracing::error!("store error during move: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("failed to update task")),
                )
                    .into_response()
            }
            ApiError::Auth(e) => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response(),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(msg)),
            )
                .into_response(),
            ApiError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::<()>::error(msg)),
            )
                .into_response(),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::error(msg))).into_response()
            }
            ApiError::Database(e) => {
                tracing::error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("internal server error")),
                )
                    .into_response()
            }
            ApiError::Other(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("internal server error")),
                )
                    .into_response()
            }
        }
    }
}
