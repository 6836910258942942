//! Synchronization service module for the tasklane application.
//!
//! This module provides the [`SyncService`] struct which owns the local task
//! store and the pending operation queue, and reconciles them with the remote
//! task service. It offers:
//! - Optimistic local mutations that are persisted before returning
//! - Immediate remote writes when online, queued replay when not
//! - A single-flight reconciliation pass ([`SyncService::sync`])
//! - Observable task and status projections

pub mod reconcile;
pub mod tasks;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::backend::Backend;
use crate::constants::{
    BODY_SESSION_EXPIRED, BODY_SYNC_FAILED, NOTIFY_SESSION_EXPIRED, NOTIFY_SYNC_COMPLETE, NOTIFY_SYNC_FAILED,
};
use crate::network::Connectivity;
use crate::notify::{Notifier, Severity};
use crate::queue::{OperationKind, PendingOperation, PendingQueue};
use crate::session::SessionManager;
use crate::storage::DurableStore;
use crate::task::Task;

/// Observable projection of the store and queue.
///
/// Recomputed after every mutation and every reconciliation pass; never
/// mutated on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub pending_count: usize,
    pub has_unsynced_changes: bool,
}

/// Counters for one completed reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Queued operations confirmed by the remote service
    pub pushed: usize,
    /// Remote tasks added locally
    pub pulled: usize,
    /// Unconfirmed local tasks queued again for creation
    pub requeued: usize,
    /// Queued operations that failed and stay queued
    pub failed: usize,
}

impl SyncReport {
    /// Number of tasks whose state reached the other side.
    pub fn synchronized(&self) -> usize {
        self.pushed + self.pulled
    }
}

/// Result of a call to [`SyncService::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No session or no connectivity; nothing was attempted
    Skipped,
    /// Another pass holds the single-flight guard
    InProgress,
    Completed(SyncReport),
    /// The remote task list could not be fetched
    Failed { message: String },
    /// The credential was rejected; the pass stopped and the session ended
    Unauthorized,
}

/// In-memory state guarded by the service mutex.
#[derive(Debug, Default)]
pub(crate) struct TaskState {
    pub(crate) tasks: Vec<Task>,
    pub(crate) queue: PendingQueue,
    pub(crate) last_sync_at: Option<DateTime<Utc>>,
    /// Remote ids deleted locally that a fetch may still report.
    pub(crate) deleted_remote: HashSet<String>,
}

impl TaskState {
    pub(crate) fn position(&self, local_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.local_id == local_id)
    }
}

/// Releases the single-flight flag when dropped, whatever the exit path.
struct SyncGuard {
    flag: Arc<AtomicBool>,
    status: Arc<watch::Sender<SyncStatus>>,
}

impl SyncGuard {
    fn acquire(flag: &Arc<AtomicBool>, status: &Arc<watch::Sender<SyncStatus>>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        status.send_modify(|s| s.is_syncing = true);
        Some(Self {
            flag: Arc::clone(flag),
            status: Arc::clone(status),
        })
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.status.send_modify(|s| s.is_syncing = false);
    }
}

/// Service that owns local task state and keeps it in sync with the remote backend.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tasklane::backend::http::HttpBackend;
/// use tasklane::network::Connectivity;
/// use tasklane::notify::LogNotifier;
/// use tasklane::session::SessionManager;
/// use tasklane::storage::{DurableStore, LocalStorage};
/// use tasklane::sync::SyncService;
/// use tasklane::task::{Task, TaskStatus};
///
/// # async fn example() -> anyhow::Result<()> {
/// let storage: Arc<dyn DurableStore> = Arc::new(LocalStorage::in_memory().await?);
/// let backend = Arc::new(HttpBackend::new("http://localhost:3000", Duration::from_secs(30))?);
/// let session = SessionManager::new(storage.clone(), Some(backend.clone()));
/// let sync_service = SyncService::new(
///     backend,
///     storage,
///     session,
///     Connectivity::new(true),
///     Arc::new(LogNotifier),
/// );
/// sync_service.load().await?;
///
/// sync_service.create_task(Task::new("Water plants", "", TaskStatus::ToDo)).await?;
/// sync_service.sync().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncService {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn DurableStore>,
    session: SessionManager,
    connectivity: Connectivity,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<TaskState>>,
    sync_in_progress: Arc<AtomicBool>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    tasks_tx: Arc<watch::Sender<Vec<Task>>>,
}

impl SyncService {
    /// Creates a service with an empty store. Call [`load`](Self::load) to
    /// read persisted state.
    pub fn new(
        backend: Arc<dyn Backend>,
        storage: Arc<dyn DurableStore>,
        session: SessionManager,
        connectivity: Connectivity,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::default());
        let (tasks_tx, _) = watch::channel(Vec::new());
        Self {
            backend,
            storage,
            session,
            connectivity,
            notifier,
            state: Arc::new(Mutex::new(TaskState::default())),
            sync_in_progress: Arc::new(AtomicBool::new(false)),
            status_tx: Arc::new(status_tx),
            tasks_tx: Arc::new(tasks_tx),
        }
    }

    /// Loads tasks and the pending queue from durable storage.
    pub async fn load(&self) -> Result<()> {
        let tasks = self.storage.load_tasks().await?;
        let queue = self.storage.load_queue().await?;
        info!("📂 Loaded {} tasks, {} pending sync", tasks.len(), queue.len());

        let mut state = self.state.lock().await;
        state.tasks = tasks;
        state.queue = queue;
        self.publish(&state);
        Ok(())
    }

    /// Snapshot of all tasks.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    /// Looks up a task by local id.
    pub async fn task(&self, local_id: &str) -> Option<Task> {
        let state = self.state.lock().await;
        state.position(local_id).map(|index| state.tasks[index].clone())
    }

    /// Snapshot of the pending queue.
    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.state.lock().await.queue.entries().to_vec()
    }

    /// A task is synced when the server knows it and nothing is queued for it.
    pub async fn is_task_synced(&self, local_id: &str) -> bool {
        let state = self.state.lock().await;
        state
            .position(local_id)
            .is_some_and(|index| state.tasks[index].is_confirmed() && !state.queue.contains(local_id))
    }

    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks_tx.subscribe()
    }

    /// Checks if a reconciliation pass is currently in flight.
    pub fn is_syncing(&self) -> bool {
        self.sync_in_progress.load(Ordering::Acquire)
    }

    /// Runs one reconciliation pass if signed in, online and idle.
    ///
    /// The single-flight guard is held for the whole pass and released on
    /// every exit path. Exactly one notification is emitted per pass outcome,
    /// none when nothing changed.
    ///
    /// # Errors
    /// Returns an error if durable storage fails; remote failures are
    /// reported through [`SyncOutcome`].
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let Some(session) = self.session.current() else {
            debug!("Sync skipped: no session");
            return Ok(SyncOutcome::Skipped);
        };
        if !self.connectivity.is_online() {
            debug!("Sync skipped: offline");
            return Ok(SyncOutcome::Skipped);
        }
        let Some(guard) = SyncGuard::acquire(&self.sync_in_progress, &self.status_tx) else {
            debug!("Sync skipped: already in progress");
            return Ok(SyncOutcome::InProgress);
        };

        let result = self.perform_sync(&session).await;
        drop(guard);

        match result {
            Ok(outcome) => {
                self.notify_outcome(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                error!("❌ Sync aborted: {e:#}");
                self.notifier.notify(NOTIFY_SYNC_FAILED, BODY_SYNC_FAILED, Severity::Error);
                Err(e)
            }
        }
    }

    /// Alias of [`sync`](Self::sync) for explicit user requests.
    pub async fn trigger_sync(&self) -> Result<SyncOutcome> {
        self.sync().await
    }

    /// Drops every task and queued operation, in memory and on disk.
    pub async fn clear_all(&self) -> Result<()> {
        info!("🧹 Clearing tasks data...");
        let mut state = self.state.lock().await;
        *state = TaskState::default();
        self.storage.save_tasks(&state.tasks).await?;
        self.storage.save_queue(&state.queue).await?;
        self.publish(&state);
        Ok(())
    }

    /// Queues `task` for `kind`, replacing any earlier entry for it.
    pub async fn enqueue(&self, task: Task, kind: OperationKind) -> Result<()> {
        let mut state = self.state.lock().await;
        debug!("Queueing {:?} for task {}", kind, task.local_id);
        state.queue.push(PendingOperation::new(task, kind));
        self.storage.save_queue(&state.queue).await?;
        self.publish(&state);
        Ok(())
    }

    /// Removes the queued entries for the given ids.
    pub async fn dequeue_confirmed(&self, local_ids: &HashSet<String>) -> Result<usize> {
        let mut state = self.state.lock().await;
        let removed = state.queue.remove_confirmed(local_ids);
        if removed > 0 {
            self.storage.save_queue(&state.queue).await?;
            self.publish(&state);
        }
        Ok(removed)
    }

    /// Pushes the projections of `state` to subscribers.
    pub(crate) fn publish(&self, state: &TaskState) {
        let status = SyncStatus {
            is_syncing: self.is_syncing(),
            last_sync_at: state.last_sync_at,
            pending_count: state.queue.len(),
            has_unsynced_changes: !state.queue.is_empty(),
        };
        self.status_tx.send_replace(status);
        self.tasks_tx.send_replace(state.tasks.clone());
    }

    fn notify_outcome(&self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Completed(report) if report.synchronized() > 0 => {
                self.notifier.notify(
                    NOTIFY_SYNC_COMPLETE,
                    &format!("{} task(s) synchronized successfully.", report.synchronized()),
                    Severity::Success,
                );
            }
            SyncOutcome::Completed(report) if report.failed > 0 => {
                self.notifier.notify(NOTIFY_SYNC_FAILED, BODY_SYNC_FAILED, Severity::Error);
            }
            SyncOutcome::Failed { .. } => {
                self.notifier.notify(NOTIFY_SYNC_FAILED, BODY_SYNC_FAILED, Severity::Error);
            }
            SyncOutcome::Unauthorized => {
                self.notifier.notify(NOTIFY_SESSION_EXPIRED, BODY_SESSION_EXPIRED, Severity::Error);
            }
            SyncOutcome::Completed(_) | SyncOutcome::Skipped | SyncOutcome::InProgress => {}
        }
    }
}
