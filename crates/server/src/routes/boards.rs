//! Board and column CRUD. This path has no write contention model; only
//! task moves are version-guarded.

use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    board::{Board, BoardWithColumns, CreateBoard},
    column::{Column, CreateColumn},
};
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    principal::{AuthPrincipal, require_admin},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(get_boards).post(create_board))
        .route("/columns", post(create_column))
}

/// All boards with their columns and tasks, ordered by position.
pub async fn get_boards(
    AuthPrincipal(_principal): AuthPrincipal,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardWithColumns>>>, ApiError> {
    let boards = Board::find_all_with_columns(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_board(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    require_admin(&principal)?;
    let board = Board::create(&state.db().pool, &payload).await?;
    tracing::info!(board_id = %board.id, user = %principal.username, "board created");
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn create_column(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<CreateColumn>,
) -> Result<ResponseJson<ApiResponse<Column>>, ApiError> {
    require_admin(&principal)?;
    let pool = &state.db().pool;
    if Board::find_by_id(pool, payload.board_id).await?.is_none() {
        return Err(ApiError::BadRequest("board not found".to_string()));
    }
    let column = Column::create(pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(column)))
}
