//! Pending operation queue.
//!
//! Holds the mutations that have not been confirmed by the remote service yet.
//! The queue keeps at most one entry per `local_id`: enqueueing for an id
//! replaces whatever was queued for it before, so the entry always carries the
//! latest intent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::task::Task;

/// The kind of remote effect an entry still has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

/// A queued intent to reconcile one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub local_id: String,
    /// Copy of the task at enqueue time.
    pub task: Task,
    pub kind: OperationKind,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(task: Task, kind: OperationKind) -> Self {
        Self {
            local_id: task.local_id.clone(),
            task,
            kind,
            enqueued_at: Utc::now(),
        }
    }
}

/// Ordered, deduplicated log of pending operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingQueue {
    entries: Vec<PendingOperation>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PendingOperation>) -> Self {
        let mut queue = Self::new();
        for entry in entries {
            queue.push(entry);
        }
        queue
    }

    /// Replaces any entry for the same task and appends `op` at the end.
    pub fn push(&mut self, op: PendingOperation) {
        self.entries.retain(|entry| entry.local_id != op.local_id);
        self.entries.push(op);
    }

    /// Removes the entry for `local_id`, returning it if present.
    pub fn remove(&mut self, local_id: &str) -> Option<PendingOperation> {
        let index = self.entries.iter().position(|entry| entry.local_id == local_id)?;
        Some(self.entries.remove(index))
    }

    /// Removes every entry whose id is in `confirmed`. Returns how many were removed.
    pub fn remove_confirmed(&mut self, confirmed: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !confirmed.contains(&entry.local_id));
        before - self.entries.len()
    }

    pub fn get(&self, local_id: &str) -> Option<&PendingOperation> {
        self.entries.iter().find(|entry| entry.local_id == local_id)
    }

    pub fn contains(&self, local_id: &str) -> bool {
        self.get(local_id).is_some()
    }

    pub fn entries(&self) -> &[PendingOperation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
