//! Column model. Columns carry an ordering position within their board but
//! are outside the concurrency-controlled move path: no version counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::task::Task;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Column {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateColumn {
    pub board_id: Uuid,
    pub title: String,
    pub position: i64,
}

/// Column with its tasks ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnWithTasks {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

impl Column {
    pub async fn create(pool: &SqlitePool, data: &CreateColumn) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            "INSERT INTO columns (id, board_id, title, position, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.board_id)
        .bind(&data.title)
        .bind(data.position)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>("SELECT * FROM columns WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_board_id(
        pool: &SqlitePool,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            "SELECT * FROM columns WHERE board_id = $1 ORDER BY position, created_at",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }
}
