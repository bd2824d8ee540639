//! WebSocket message types for viewer connections.

use serde::{Deserialize, Serialize};
use services::services::events::TaskUpdate;
use uuid::Uuid;

/// Messages sent from a viewer to its instance. Fire-and-forget: no
/// acknowledgement, and an unknown board id is simply an empty group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Start receiving updates for a board
    #[serde(rename = "join_board")]
    JoinBoard { board_id: Uuid },

    /// Stop receiving updates for a board
    #[serde(rename = "leave_board")]
    LeaveBoard { board_id: Uuid },
}

/// Messages sent from the instance to a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Sent once on connect; the viewer tags its move requests with this id
    /// so the server can skip echoing its own changes back.
    #[serde(rename = "connected")]
    Connected { connection_id: Uuid },

    /// A task on a joined board changed; carries the post-write state.
    #[serde(rename = "task_updated")]
    TaskUpdated(TaskUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_board_wire_format() {
        let board_id = Uuid::new_v4();
        let msg: ClientMessage =
            serde_json::from_value(serde_json::json!({
                "type": "join_board",
                "data": { "board_id": board_id }
            }))
            .unwrap();
        assert!(matches!(msg, ClientMessage::JoinBoard { board_id: b } if b == board_id));
    }

    #[test]
    fn connected_message_is_tagged() {
        let connection_id = Uuid::new_v4();
        let json =
            serde_json::to_value(ServerMessage::Connected { connection_id }).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(
            json["data"]["connection_id"],
            serde_json::json!(connection_id)
        );
    }
}
