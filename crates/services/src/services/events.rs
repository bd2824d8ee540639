//! Event payloads shared by the cluster bus and the connection-group fanout.

use db::models::task::Task;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The update delivered to viewers of a board: the task's post-write state,
/// version included. Recipients must treat the version as authoritative and
/// ignore anything stale; no delivery order is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub board_id: Uuid,
    pub task: Task,
}

/// The cluster channel message: the update plus the originating connection,
/// so the one instance that holds that connection can skip echoing the
/// change back to its initiator. Every other instance finds no such member
/// and delivers to all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEvent {
    pub board_id: Uuid,
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_connection_id: Option<Uuid>,
}

impl BoardEvent {
    pub fn update(&self) -> TaskUpdate {
        TaskUpdate {
            board_id: self.board_id,
            task: self.task.clone(),
        }
    }
}
