//! Task creation and the version-checked move endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{post, put},
};
use db::models::{
    column::Column,
    task::{CreateTask, Task},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use services::services::sync::MoveTaskRequest;

use crate::{AppState, error::ApiError, principal::AuthPrincipal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/{task_id}/move", put(move_task))
}

pub async fn create_task(
    AuthPrincipal(_principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let pool = &state.db().pool;
    if Column::find_by_id(pool, payload.column_id).await?.is_none() {
        return Err(ApiError::BadRequest("column not found".to_string()));
    }
    let task = Task::create(pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// Move a task: accepted iff the request's `version` still matches the
/// stored one. 409 with the current snapshot on conflict, 404 when the task
/// is gone. Fanout to other viewers happens after acceptance and cannot
/// fail this request.
pub async fn move_task(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<MoveTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    tracing::debug!(
        task_id = %task_id,
        user = %principal.username,
        expected_version = payload.version,
        "move requested"
    );
    let task = state.sync().move_task(task_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}
