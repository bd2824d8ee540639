//! Task model and the version-checked compare-and-swap that guards moves.
//!
//! Every accepted move increments `version` by exactly one. Two concurrent
//! movers carrying the same expected version can never both win: the
//! conditional UPDATE is a single atomic statement, so exactly one matches
//! the row and the other sees zero rows updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
}

impl Task {
    pub async fn create(pool: &SqlitePool, data: &CreateTask) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, column_id, title, description, position, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.column_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.position)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_column_id(
        pool: &SqlitePool,
        column_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE column_id = $1 ORDER BY position, created_at",
        )
        .bind(column_id)
        .fetch_all(pool)
        .await
    }

    /// Compare-and-swap move: relocate the task iff the caller's expected
    /// version still matches the stored one.
    ///
    /// Returns `Some(task)` with the post-write version on acceptance, `None`
    /// when the version check failed or the task does not exist. The caller
    /// distinguishes the two by refetching.
    pub async fn try_move(
        pool: &SqlitePool,
        id: Uuid,
        expected_version: i64,
        new_column_id: Uuid,
        new_position: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "UPDATE tasks
             SET column_id = $3, position = $4, version = version + 1, updated_at = $5
             WHERE id = $1 AND version = $2
             RETURNING *",
        )
        .bind(id)
        .bind(expected_version)
        .bind(new_column_id)
        .bind(new_position)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        column::{Column, CreateColumn},
    };
    use crate::test_utils::setup_test_pool;

    async fn seed_task(pool: &SqlitePool) -> (Board, Column, Task) {
        let board = Board::create(
            pool,
            &CreateBoard {
                title: "Sprint".to_string(),
            },
        )
        .await
        .unwrap();
        let column = Column::create(
            pool,
            &CreateColumn {
                board_id: board.id,
                title: "Todo".to_string(),
                position: 0,
            },
        )
        .await
        .unwrap();
        let task = Task::create(
            pool,
            &CreateTask {
                column_id: column.id,
                title: "Write tests".to_string(),
                description: None,
                position: 0,
            },
        )
        .await
        .unwrap();
        (board, column, task)
    }

    #[tokio::test]
    async fn create_starts_at_version_zero() {
        let (pool, _dir) = setup_test_pool().await;
        let (_, _, task) = seed_task(&pool).await;
        assert_eq!(task.version, 0);
    }

    #[tokio::test]
    async fn try_move_with_matching_version_increments_by_one() {
        let (pool, _dir) = setup_test_pool().await;
        let (board, _, task) = seed_task(&pool).await;
        let target = Column::create(
            &pool,
            &CreateColumn {
                board_id: board.id,
                title: "Doing".to_string(),
                position: 1,
            },
        )
        .await
        .unwrap();

        let moved = Task::try_move(&pool, task.id, 0, target.id, 3)
            .await
            .unwrap()
            .expect("move should be accepted");

        assert_eq!(moved.version, 1);
        assert_eq!(moved.column_id, target.id);
        assert_eq!(moved.position, 3);
    }

    #[tokio::test]
    async fn try_move_with_stale_version_is_rejected_without_mutation() {
        let (pool, _dir) = setup_test_pool().await;
        let (_, column, task) = seed_task(&pool).await;

        let rejected = Task::try_move(&pool, task.id, 5, column.id, 1).await.unwrap();
        assert!(rejected.is_none());

        let current = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(current.version, 0);
        assert_eq!(current.position, 0);
    }

    #[tokio::test]
    async fn try_move_unknown_task_returns_none() {
        let (pool, _dir) = setup_test_pool().await;
        let (_, column, _) = seed_task(&pool).await;

        let missing = Task::try_move(&pool, Uuid::new_v4(), 0, column.id, 0)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn concurrent_moves_with_same_expected_version_accept_exactly_one() {
        let (pool, _dir) = setup_test_pool().await;
        let (board, _, task) = seed_task(&pool).await;
        let target = Column::create(
            &pool,
            &CreateColumn {
                board_id: board.id,
                title: "Done".to_string(),
                position: 1,
            },
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            let task_id = task.id;
            let target_id = target.id;
            handles.push(tokio::spawn(async move {
                Task::try_move(&pool, task_id, 0, target_id, i).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);

        let current = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.column_id, target.id);
    }
}
