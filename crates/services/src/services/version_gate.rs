//! Recipient-side idempotent apply.
//!
//! The transport guarantees neither ordering nor uniqueness of update
//! events, so every recipient tracks the highest version it has applied per
//! task and drops anything at or below it. One gate per viewer session.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct VersionGate {
    seen: HashMap<Uuid, i64>,
}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the update should be applied, false when it is a
    /// duplicate or arrives out of order behind an already-applied version.
    pub fn admit(&mut self, task_id: Uuid, version: i64) -> bool {
        match self.seen.get(&task_id) {
            Some(&applied) if version <= applied => false,
            _ => {
                self.seen.insert(task_id, version);
                true
            }
        }
    }
}
