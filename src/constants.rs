//! Constants used throughout the application
//!
//! This module centralizes notification texts, storage keys and other
//! constant values to improve maintainability and consistency.

// Durable store keys
pub const STORAGE_KEY_TASKS: &str = "tasks";
pub const STORAGE_KEY_PENDING_SYNC: &str = "pending_sync";
pub const STORAGE_KEY_SESSION: &str = "user";

// Notification titles
pub const NOTIFY_SYNC_COMPLETE: &str = "Sync Complete";
pub const NOTIFY_SYNC_FAILED: &str = "Sync Failed";
pub const NOTIFY_SESSION_EXPIRED: &str = "Session Expired";
pub const NOTIFY_OFFLINE: &str = "Offline";
pub const NOTIFY_TASK_PUBLIC: &str = "Task made public";
pub const NOTIFY_TASK_PRIVATE: &str = "Task made private";

// Notification bodies
pub const BODY_SYNC_FAILED: &str = "Failed to sync tasks. Will retry automatically.";
pub const BODY_SESSION_EXPIRED: &str = "Your session has expired. Please login again.";
pub const BODY_TASK_SAVED_OFFLINE: &str = "Task saved locally. Will sync when online.";
pub const BODY_CHANGES_SAVED_OFFLINE: &str = "Changes saved locally. Will sync when online.";
pub const BODY_DELETION_SAVED_OFFLINE: &str = "Deletion saved locally. Will sync when online.";
pub const BODY_TASK_PUBLIC: &str = "This task is now visible to others.";
pub const BODY_TASK_PRIVATE: &str = "This task is now private.";

// Messages
pub const CONFIG_GENERATED: &str = "✅ Generated default configuration file";
pub const ERROR_NO_API_TOKEN: &str = "❌ Error: no session stored and API token environment variable not set";

// Defaults
/// Default remote service address
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Environment variable holding a pre-issued bearer token
pub const DEFAULT_API_TOKEN_ENV: &str = "TASKLANE_API_TOKEN";
/// Default periodic sync interval in minutes
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 5;
/// Upper bound for the periodic sync interval (24 hours)
pub const MAX_SYNC_INTERVAL_MINUTES: u64 = 1440;
/// Number of log lines retained in memory
pub const LOG_BUFFER_CAPACITY: usize = 500;
