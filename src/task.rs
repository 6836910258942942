//! Task data model.
//!
//! A [`Task`] is keyed by its device-local `local_id`, which never changes.
//! The `remote_id` is only attached once the remote service has confirmed the
//! task and is afterwards only replaced by another server-confirmed response.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow status of a task. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Completed,
    WontDo,
}

impl TaskStatus {
    /// Display tag derived from the status.
    pub fn icon(self) -> &'static str {
        match self {
            Self::ToDo => "file",
            Self::InProgress => "clock",
            Self::Completed => "check",
            Self::WontDo => "coffee",
        }
    }
}

/// A unit of work tracked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_public: bool,
}

impl Task {
    /// Creates a new, never-synced task with a fresh local id.
    pub fn new(title: impl Into<String>, description: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            local_id: Uuid::new_v4().to_string(),
            remote_id: None,
            title: title.into(),
            description: description.into(),
            status,
            is_public: false,
        }
    }

    /// Display tag for this task, always consistent with `status`.
    pub fn icon(&self) -> &'static str {
        self.status.icon()
    }

    /// Whether the remote service has ever confirmed this task.
    pub fn is_confirmed(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Adopts the fields of a server-confirmed copy while keeping the local id.
    pub fn adopt_confirmed(&mut self, confirmed: Task) {
        let local_id = std::mem::take(&mut self.local_id);
        *self = Task { local_id, ..confirmed };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_follows_status() {
        let mut task = Task::new("Write report", "", TaskStatus::ToDo);
        assert_eq!(task.icon(), "file");
        task.status = TaskStatus::WontDo;
        assert_eq!(task.icon(), "coffee");
    }

    #[test]
    fn test_adopt_confirmed_preserves_local_id() {
        let mut task = Task::new("Draft", "", TaskStatus::ToDo);
        let local_id = task.local_id.clone();

        let confirmed = Task {
            local_id: "r9".to_string(),
            remote_id: Some("r9".to_string()),
            title: "Draft (server)".to_string(),
            description: "from server".to_string(),
            status: TaskStatus::InProgress,
            is_public: true,
        };
        task.adopt_confirmed(confirmed);

        assert_eq!(task.local_id, local_id);
        assert_eq!(task.remote_id.as_deref(), Some("r9"));
        assert_eq!(task.title, "Draft (server)");
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&TaskStatus::WontDo).unwrap();
        assert_eq!(json, "\"WONT_DO\"");
    }
}
