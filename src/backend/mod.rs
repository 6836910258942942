//! Remote task service abstraction.
//!
//! This module defines the interface the sync engine uses to reach the
//! authoritative task service, along with the error taxonomy it reports.
//! Authorization failures are a distinct variant because they end the current
//! session instead of being retried.

use async_trait::async_trait;

use crate::task::Task;

pub mod factory;
pub mod http;

/// Errors reported by a remote backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The session credential is no longer accepted.
    #[error("Authorization expired")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    /// The service answered but refused the request (conflict, validation, 5xx).
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl BackendError {
    /// Whether this failure requires re-authentication rather than a retry.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidData(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Task operations offered by the remote service.
///
/// Tasks returned by a backend carry the server id in `remote_id`; their
/// `local_id` is only a placeholder and callers keep their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend type identifier (e.g., "rest").
    fn backend_type(&self) -> &str;

    async fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, BackendError>;
    async fn create_task(&self, task: &Task, token: &str) -> Result<Task, BackendError>;
    async fn update_task(&self, remote_id: &str, task: &Task, token: &str) -> Result<Task, BackendError>;
    async fn delete_task(&self, remote_id: &str, token: &str) -> Result<(), BackendError>;

    /// Cheap reachability check used by the connectivity probe.
    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Account operations offered by the remote service. Both return a bearer token.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<String, BackendError>;
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<String, BackendError>;
}
