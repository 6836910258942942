use anyhow::{bail, Result};
use log::{info, warn};

use crate::backend::BackendError;
use crate::constants::{
    BODY_CHANGES_SAVED_OFFLINE, BODY_DELETION_SAVED_OFFLINE, BODY_SESSION_EXPIRED, BODY_TASK_PRIVATE,
    BODY_TASK_PUBLIC, BODY_TASK_SAVED_OFFLINE, NOTIFY_OFFLINE, NOTIFY_SESSION_EXPIRED, NOTIFY_TASK_PRIVATE,
    NOTIFY_TASK_PUBLIC,
};
use crate::notify::Severity;
use crate::queue::OperationKind;
use crate::sync::SyncService;
use crate::task::{Task, TaskStatus};

impl SyncService {
    /// Adds a new task locally and pushes it to the remote backend.
    ///
    /// The task is stored and persisted before any network activity. When
    /// signed in but offline, or when the remote call fails, a `Create` is
    /// queued instead.
    ///
    /// # Returns
    /// The stored task, carrying its `remote_id` if the server confirmed it
    ///
    /// # Errors
    /// Returns an error if a task with the same local id exists or local
    /// storage fails
    pub async fn create_task(&self, task: Task) -> Result<Task> {
        {
            let mut state = self.state.lock().await;
            if state.position(&task.local_id).is_some() {
                bail!("Task already exists: {}", task.local_id);
            }
            state.tasks.push(task.clone());
            self.storage.save_tasks(&state.tasks).await?;
            self.publish(&state);
        }
        info!("➕ Adding task: {}", task.title);

        self.push_change(task.clone(), OperationKind::Create).await?;
        Ok(self.task(&task.local_id).await.unwrap_or(task))
    }

    /// Replaces a task's editable fields.
    ///
    /// The stored `remote_id` always wins over the one carried by `task`,
    /// since only server responses may change it. A task the server has never
    /// confirmed is pushed as a `Create`.
    ///
    /// # Errors
    /// Returns an error if the task does not exist or local storage fails
    pub async fn update_task(&self, mut task: Task) -> Result<Task> {
        {
            let mut state = self.state.lock().await;
            let Some(index) = state.position(&task.local_id) else {
                bail!("Task not found: {}", task.local_id);
            };
            task.remote_id = state.tasks[index].remote_id.clone();
            state.tasks[index] = task.clone();
            self.storage.save_tasks(&state.tasks).await?;
            self.publish(&state);
        }
        info!("✏️  Updating task: {}", task.title);

        let kind = if task.is_confirmed() {
            OperationKind::Update
        } else {
            OperationKind::Create
        };
        self.push_change(task.clone(), kind).await?;
        Ok(self.task(&task.local_id).await.unwrap_or(task))
    }

    /// Moves a task to another status column.
    pub async fn set_task_status(&self, local_id: &str, status: TaskStatus) -> Result<Task> {
        let Some(mut task) = self.task(local_id).await else {
            bail!("Task not found: {}", local_id);
        };
        task.status = status;
        self.update_task(task).await
    }

    /// Makes a task public or private.
    pub async fn set_task_visibility(&self, local_id: &str, is_public: bool) -> Result<Task> {
        let Some(mut task) = self.task(local_id).await else {
            bail!("Task not found: {}", local_id);
        };
        task.is_public = is_public;
        let task = self.update_task(task).await?;

        if is_public {
            self.notifier.notify(NOTIFY_TASK_PUBLIC, BODY_TASK_PUBLIC, Severity::Default);
        } else {
            self.notifier.notify(NOTIFY_TASK_PRIVATE, BODY_TASK_PRIVATE, Severity::Default);
        }
        Ok(task)
    }

    /// Removes a task and anything queued for it.
    ///
    /// Tasks the server already knows are deleted remotely (or a `Delete` is
    /// queued); never-confirmed tasks simply disappear.
    ///
    /// # Errors
    /// Returns an error if the task does not exist or local storage fails
    pub async fn delete_task(&self, local_id: &str) -> Result<()> {
        let removed = {
            let mut state = self.state.lock().await;
            let Some(index) = state.position(local_id) else {
                bail!("Task not found: {}", local_id);
            };
            let removed = state.tasks.remove(index);
            if let Some(remote_id) = removed.remote_id.clone() {
                state.deleted_remote.insert(remote_id);
            }
            let dropped = state.queue.remove(local_id);
            self.storage.save_tasks(&state.tasks).await?;
            if dropped.is_some() {
                self.storage.save_queue(&state.queue).await?;
            }
            self.publish(&state);
            removed
        };
        info!("🗑️  Deleting task: {}", removed.title);

        if removed.is_confirmed() {
            self.push_change(removed, OperationKind::Delete).await?;
        }
        Ok(())
    }

    /// Sends one remote call for `task`, or explains why it has no remote effect.
    ///
    /// # Returns
    /// The server's copy for creates and updates, `None` for deletes
    pub(crate) async fn apply_remote(
        &self,
        task: &Task,
        kind: OperationKind,
        token: &str,
    ) -> Result<Option<Task>, BackendError> {
        match (kind, task.remote_id.as_deref()) {
            (OperationKind::Create, _) | (OperationKind::Update, None) => {
                self.backend.create_task(task, token).await.map(Some)
            }
            (OperationKind::Update, Some(remote_id)) => self.backend.update_task(remote_id, task, token).await.map(Some),
            (OperationKind::Delete, Some(remote_id)) => self.backend.delete_task(remote_id, token).await.map(|_| None),
            (OperationKind::Delete, None) => Ok(None),
        }
    }

    /// Adopts a server-confirmed copy into the local task, keeping its local id.
    /// Returns false if the task no longer exists locally.
    pub(crate) fn adopt_into(state: &mut super::TaskState, local_id: &str, confirmed: Task) -> bool {
        match state.position(local_id) {
            Some(index) => {
                state.tasks[index].adopt_confirmed(confirmed);
                true
            }
            None => false,
        }
    }

    /// Mutation-time remote write: push now if possible, otherwise queue.
    async fn push_change(&self, task: Task, kind: OperationKind) -> Result<()> {
        let Some(session) = self.session.current() else {
            // Nothing to reconcile against; the change stays local.
            return Ok(());
        };

        if !self.connectivity.is_online() {
            self.enqueue(task, kind).await?;
            self.notify_queued(kind);
            return Ok(());
        }

        match self.apply_remote(&task, kind, &session.token).await {
            Ok(confirmed) => {
                let mut state = self.state.lock().await;
                if let Some(confirmed) = confirmed {
                    Self::adopt_into(&mut state, &task.local_id, confirmed);
                    self.storage.save_tasks(&state.tasks).await?;
                }
                // The pushed change supersedes anything queued earlier.
                if state.queue.remove(&task.local_id).is_some() {
                    self.storage.save_queue(&state.queue).await?;
                }
                self.publish(&state);
                info!("✅ Task {} {:?} confirmed by server", task.local_id, kind);
            }
            Err(e) if e.is_unauthorized() => {
                warn!("🔒 {:?} of task {} rejected: session expired", kind, task.local_id);
                self.session.handle_unauthorized().await?;
                self.notifier
                    .notify(NOTIFY_SESSION_EXPIRED, BODY_SESSION_EXPIRED, Severity::Error);
            }
            Err(e) => {
                warn!("⚠️  {:?} of task {} failed, queueing: {e}", kind, task.local_id);
                self.enqueue(task, kind).await?;
                self.notify_queued(kind);
            }
        }
        Ok(())
    }

    fn notify_queued(&self, kind: OperationKind) {
        let body = match kind {
            OperationKind::Create => BODY_TASK_SAVED_OFFLINE,
            OperationKind::Update => BODY_CHANGES_SAVED_OFFLINE,
            OperationKind::Delete => BODY_DELETION_SAVED_OFFLINE,
        };
        self.notifier.notify(NOTIFY_OFFLINE, body, Severity::Default);
    }
}
