//! Connection group: per-process registry of live viewer connections and
//! their board memberships.
//!
//! This is the only process-wide mutable shared resource per instance. All
//! mutation goes through the methods below, which take the lock briefly and
//! never hold it across a store or bus await. Delivery is best effort: a
//! member whose channel is gone or full is skipped and logged, never an
//! error to the broadcaster.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use super::events::TaskUpdate;

/// Outbound channel buffer per connection.
const OUTGOING_BUFFER_SIZE: usize = 64;

#[derive(Debug)]
struct ConnectionEntry {
    sender: mpsc::Sender<TaskUpdate>,
    boards: HashSet<Uuid>,
}

#[derive(Debug, Default)]
struct Inner {
    /// connection_id -> outbound channel + joined boards
    connections: HashMap<Uuid, ConnectionEntry>,
    /// board_id -> member connection ids
    board_members: HashMap<Uuid, HashSet<Uuid>>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardConnections {
    inner: Arc<RwLock<Inner>>,
}

impl BoardConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back the receiving end of its
    /// outbound event channel.
    pub async fn register(&self, connection_id: Uuid) -> mpsc::Receiver<TaskUpdate> {
        let (tx, rx) = mpsc::channel(OUTGOING_BUFFER_SIZE);
        let mut inner = self.inner.write().await;
        inner.connections.insert(
            connection_id,
            ConnectionEntry {
                sender: tx,
                boards: HashSet::new(),
            },
        );
        tracing::debug!(connection_id = %connection_id, "connection registered");
        rx
    }

    /// Remove a connection entirely: membership in every board plus its
    /// channel. Invoked on disconnect so no orphaned membership survives.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.connections.remove(&connection_id) {
            for board_id in entry.boards {
                if let Some(members) = inner.board_members.get_mut(&board_id) {
                    members.remove(&connection_id);
                    if members.is_empty() {
                        inner.board_members.remove(&board_id);
                    }
                }
            }
            tracing::debug!(connection_id = %connection_id, "connection unregistered");
        }
    }

    /// Add the connection to a board's member set. Idempotent; unknown
    /// connections are ignored.
    pub async fn join(&self, board_id: Uuid, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.connections.get_mut(&connection_id) else {
            return;
        };
        entry.boards.insert(board_id);
        inner
            .board_members
            .entry(board_id)
            .or_default()
            .insert(connection_id);
    }

    /// Remove the connection from a board's member set. Idempotent; no-op
    /// when absent or when the board was never joined.
    pub async fn leave(&self, board_id: Uuid, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.connections.get_mut(&connection_id) {
            entry.boards.remove(&board_id);
        }
        if let Some(members) = inner.board_members.get_mut(&board_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                inner.board_members.remove(&board_id);
            }
        }
    }

    /// Remove the connection from every board it belongs to, keeping the
    /// connection itself registered.
    pub async fn drop_all(&self, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        let boards = match inner.connections.get_mut(&connection_id) {
            Some(entry) => std::mem::take(&mut entry.boards),
            None => return,
        };
        for board_id in boards {
            if let Some(members) = inner.board_members.get_mut(&board_id) {
                members.remove(&connection_id);
                if members.is_empty() {
                    inner.board_members.remove(&board_id);
                }
            }
        }
    }

    /// Deliver `update` to every member of the board except `exclude`.
    /// Returns the number of members the update was handed to.
    pub async fn broadcast(
        &self,
        board_id: Uuid,
        update: TaskUpdate,
        exclude: Option<Uuid>,
    ) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.board_members.get(&board_id) else {
            return 0;
        };

        let mut delivered = 0;
        for member in members {
            if Some(*member) == exclude {
                continue;
            }
            let Some(entry) = inner.connections.get(member) else {
                continue;
            };
            match entry.sender.try_send(update.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %member,
                        board_id = %board_id,
                        "dropping update for unreachable connection: {e}"
                    );
                }
            }
        }
        delivered
    }

    /// Current member count for a board (test/diagnostic helper).
    pub async fn member_count(&self, board_id: Uuid) -> usize {
        let inner = self.inner.read().await;
        inner.board_members.get(&board_id).map_or(0, HashSet::len)
    }
}
