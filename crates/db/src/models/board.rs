//! Board model. A board is a grouping scope for columns and tasks and the
//! partition key for update fanout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::column::{Column, ColumnWithTasks};
use super::task::Task;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoard {
    pub title: String,
}

/// Board with its columns and their tasks, both ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardWithColumns {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnWithTasks>,
}

impl Board {
    pub async fn create(pool: &SqlitePool, data: &CreateBoard) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Board>(
            "INSERT INTO boards (id, title, created_at, updated_at)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>("SELECT * FROM boards ORDER BY created_at")
            .fetch_all(pool)
            .await
    }

    /// All boards with nested columns and tasks, ordered by position.
    pub async fn find_all_with_columns(
        pool: &SqlitePool,
    ) -> Result<Vec<BoardWithColumns>, sqlx::Error> {
        let boards = Self::find_all(pool).await?;

        let mut result = Vec::with_capacity(boards.len());
        for board in boards {
            let columns = Column::find_by_board_id(pool, board.id).await?;
            let mut with_tasks = Vec::with_capacity(columns.len());
            for column in columns {
                let tasks = Task::find_by_column_id(pool, column.id).await?;
                with_tasks.push(ColumnWithTasks { column, tasks });
            }
            result.push(BoardWithColumns {
                board,
                columns: with_tasks,
            });
        }
        Ok(result)
    }
}
