//! Move orchestration: conflict guard in front of the record store, then
//! bus publish, with a per-instance dispatcher pumping bus deliveries into
//! the local connection group.

use std::sync::Arc;

use db::models::{column::Column, task::Task};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use uuid::Uuid;

use super::{
    board_connections::BoardConnections,
    cluster_bus::ClusterBus,
    events::BoardEvent,
};

/// A viewer's request to move a task: target location plus the version the
/// viewer last observed.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveTaskRequest {
    pub column_id: Uuid,
    pub position: i64,
    pub version: i64,
    /// The requester's live connection, when it has one; used only to skip
    /// echoing the update back to its initiator.
    pub connection_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum MoveError {
    /// The expected version was stale. Carries the current record so the
    /// caller can reconcile (refetch and retry, or surface to the user);
    /// nothing was mutated and no retry happens here.
    #[error("task was modified by another viewer")]
    Conflict(Task),
    #[error("task not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Orchestrates version-checked moves and their cluster-wide fanout.
#[derive(Clone)]
pub struct BoardSync {
    pool: SqlitePool,
    bus: Arc<dyn ClusterBus>,
}

impl BoardSync {
    pub fn new(pool: SqlitePool, bus: Arc<dyn ClusterBus>) -> Self {
        Self { pool, bus }
    }

    /// Attempt a version-checked move. Terminal in one step: accepted with
    /// version + 1, rejected as a conflict, or rejected as not-found.
    ///
    /// On acceptance the post-write state is published to the cluster bus.
    /// Publish failures are logged and swallowed: the write has already
    /// committed, so fanout trouble must never fail the requester.
    pub async fn move_task(&self, task_id: Uuid, req: &MoveTaskRequest) -> Result<Task, MoveError> {
        let moved =
            Task::try_move(&self.pool, task_id, req.version, req.column_id, req.position).await?;

        let task = match moved {
            Some(task) => task,
            None => {
                // Zero rows matched: either the version was stale or the
                // task is gone. The refetch tells us which, and on conflict
                // hands the caller the now-current snapshot.
                return match Task::find_by_id(&self.pool, task_id).await? {
                    Some(current) => Err(MoveError::Conflict(current)),
                    None => Err(MoveError::NotFound),
                };
            }
        };

        let board_id = match Column::find_by_id(&self.pool, task.column_id).await? {
            Some(column) => column.board_id,
            None => {
                // Target column vanished between the move and the lookup.
                // The write stands; there is just no live board to notify.
                tracing::warn!(task_id = %task.id, "moved task's column has no board, skipping fanout");
                return Ok(task);
            }
        };

        let event = BoardEvent {
            board_id,
            task: task.clone(),
            origin_connection_id: req.connection_id,
        };
        if let Err(e) = self.bus.publish(&event).await {
            tracing::warn!(board_id = %board_id, task_id = %task.id, "bus publish failed: {e}");
        }

        Ok(task)
    }

    /// Spawn this instance's fanout dispatcher: every bus delivery, local or
    /// remote in origin, is emitted to the local connection group. The
    /// origin connection is excluded; it is only ever a member on the
    /// instance that physically holds it, so the exclusion is naturally
    /// scoped to the originating instance.
    pub fn spawn_dispatcher(&self, connections: BoardConnections) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let delivered = connections
                            .broadcast(event.board_id, event.update(), event.origin_connection_id)
                            .await;
                        tracing::debug!(
                            board_id = %event.board_id,
                            task_id = %event.task.id,
                            version = event.task.version,
                            delivered,
                            "task update dispatched"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "dispatcher lagged behind the bus, events lost");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
