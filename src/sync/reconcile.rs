//! The reconciliation pass.
//!
//! One pass fetches the remote task list, replays the pending queue against
//! it, drains what the server confirmed, merges remote-only tasks into the
//! local store and persists the result. Replay failures are contained per
//! entry; only an authorization failure stops the pass early.

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashSet;

use super::{SyncOutcome, SyncReport, SyncService, TaskState};
use crate::backend::BackendError;
use crate::queue::{OperationKind, PendingOperation};
use crate::session::Session;

impl SyncService {
    /// Internal sync implementation. The caller holds the single-flight guard.
    pub(super) async fn perform_sync(&self, session: &Session) -> Result<SyncOutcome> {
        info!("🔄 Starting sync process...");
        let token = session.token.as_str();

        let remote_tasks = match self.backend.fetch_tasks(token).await {
            Ok(tasks) => {
                info!("✅ Fetched {} tasks from backend", tasks.len());
                tasks
            }
            Err(BackendError::Unauthorized) => {
                warn!("🔒 Authorization expired while fetching tasks");
                self.session.handle_unauthorized().await?;
                return Ok(SyncOutcome::Unauthorized);
            }
            Err(e) => {
                error!("❌ Failed to fetch tasks: {e}");
                return Ok(SyncOutcome::Failed {
                    message: format!("Failed to fetch tasks: {e}"),
                });
            }
        };
        let confirmed_remote: HashSet<String> = remote_tasks.iter().filter_map(|t| t.remote_id.clone()).collect();

        let pending: Vec<PendingOperation> = self.state.lock().await.queue.entries().to_vec();
        info!("📤 Replaying {} pending operations", pending.len());

        let mut report = SyncReport::default();
        let mut replayed: Vec<PendingOperation> = Vec::new();

        for op in &pending {
            match self.replay(op, &confirmed_remote, token).await {
                Ok(()) => replayed.push(op.clone()),
                Err(BackendError::Unauthorized) => {
                    warn!("🔒 Authorization expired while replaying task {}", op.local_id);
                    // Keep what the server already confirmed; leave the queue as is.
                    {
                        let state = self.state.lock().await;
                        self.storage.save_tasks(&state.tasks).await?;
                        self.publish(&state);
                    }
                    self.session.handle_unauthorized().await?;
                    return Ok(SyncOutcome::Unauthorized);
                }
                Err(e) => {
                    warn!("⚠️  {:?} of task {} failed, keeping it queued: {e}", op.kind, op.local_id);
                    report.failed += 1;
                }
            }
        }
        report.pushed = replayed.len();

        let mut state = self.state.lock().await;
        Self::drain_replayed(&mut state, &replayed);

        // Remote ids deleted locally must not come back through the merge,
        // even when the delete happened after the fetch.
        let mut deleted_remote: HashSet<String> = pending
            .iter()
            .chain(state.queue.entries())
            .filter(|op| op.kind == OperationKind::Delete)
            .filter_map(|op| op.task.remote_id.clone())
            .collect();
        deleted_remote.extend(state.deleted_remote.iter().cloned());

        for remote in remote_tasks {
            let Some(remote_id) = remote.remote_id.as_deref() else {
                continue;
            };
            if deleted_remote.contains(remote_id) {
                continue;
            }
            let represented = state
                .tasks
                .iter()
                .any(|local| local.remote_id.as_deref() == Some(remote_id) || local.local_id == remote.local_id);
            if !represented {
                info!("📥 Adding new task from server: {}", remote.title);
                state.tasks.push(remote);
                report.pulled += 1;
            }
        }
        // Once the server stops listing a deleted id it cannot come back.
        state.deleted_remote.retain(|id| confirmed_remote.contains(id));

        let unconfirmed: Vec<_> = state
            .tasks
            .iter()
            .filter(|task| {
                !task.is_confirmed() && !state.queue.contains(&task.local_id) && !confirmed_remote.contains(&task.local_id)
            })
            .cloned()
            .collect();
        for task in unconfirmed {
            debug!("Re-queueing unconfirmed task {}", task.local_id);
            state.queue.push(PendingOperation::new(task, OperationKind::Create));
            report.requeued += 1;
        }

        state.last_sync_at = Some(Utc::now());
        self.storage.save_tasks(&state.tasks).await?;
        self.storage.save_queue(&state.queue).await?;
        self.publish(&state);

        info!(
            "✅ Sync completed. {} pushed, {} pulled, {} requeued, {} failed, {} pending",
            report.pushed,
            report.pulled,
            report.requeued,
            report.failed,
            state.queue.len()
        );
        Ok(SyncOutcome::Completed(report))
    }

    /// Replays one queued operation and applies the server's answer to the
    /// in-memory store. Persisting is left to the caller.
    async fn replay(
        &self,
        op: &PendingOperation,
        confirmed_remote: &HashSet<String>,
        token: &str,
    ) -> Result<(), BackendError> {
        debug!("Processing sync item: {:?} for task {}", op.kind, op.local_id);

        // The local task may have gained a remote id after the snapshot was taken.
        let current_remote_id = {
            let state = self.state.lock().await;
            state.position(&op.local_id).and_then(|index| state.tasks[index].remote_id.clone())
        };
        let mut task = op.task.clone();
        if let Some(remote_id) = current_remote_id {
            task.remote_id = Some(remote_id);
        }

        if op.kind == OperationKind::Create {
            if let Some(remote_id) = task.remote_id.as_deref() {
                if confirmed_remote.contains(remote_id) {
                    debug!("Task {} already exists remotely as {}", op.local_id, remote_id);
                    return Ok(());
                }
            }
            // A stale remote id must not turn a create into an update.
            task.remote_id = None;
        }

        let confirmed = self.apply_remote(&task, op.kind, token).await?;
        if let Some(confirmed) = confirmed {
            let mut state = self.state.lock().await;
            let superseded = state.queue.get(&op.local_id) != Some(op);
            if op.kind == OperationKind::Create || superseded {
                // Only the server id is adopted; local edits made since stay.
                if let Some(index) = state.position(&op.local_id) {
                    if confirmed.remote_id.is_some() {
                        state.tasks[index].remote_id = confirmed.remote_id;
                    }
                }
            } else {
                Self::adopt_into(&mut state, &op.local_id, confirmed);
            }
            self.publish(&state);
        }
        Ok(())
    }

    /// Removes replayed entries, unless a newer intent replaced them meanwhile.
    fn drain_replayed(state: &mut TaskState, replayed: &[PendingOperation]) -> usize {
        let confirmed: HashSet<String> = replayed
            .iter()
            .filter(|op| state.queue.get(&op.local_id) == Some(*op))
            .map(|op| op.local_id.clone())
            .collect();
        state.queue.remove_confirmed(&confirmed)
    }
}
