//! Durable storage for the task collection, the pending queue and the session.
//!
//! The sync engine only talks to the [`DurableStore`] trait; the collections
//! are opaque serialized values to it. [`LocalStorage`] is the SQLite-backed
//! implementation built on SeaORM.

pub mod db;

use anyhow::Result;
use async_trait::async_trait;

use crate::queue::PendingQueue;
use crate::session::Session;
use crate::task::Task;

pub use db::LocalStorage;

/// Persistent load/save of the engine's collections. Each call is atomic.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load_tasks(&self) -> Result<Vec<Task>>;
    async fn save_tasks(&self, tasks: &[Task]) -> Result<()>;

    async fn load_queue(&self) -> Result<PendingQueue>;
    async fn save_queue(&self, queue: &PendingQueue) -> Result<()>;

    async fn load_session(&self) -> Result<Option<Session>>;
    async fn save_session(&self, session: &Session) -> Result<()>;
    async fn clear_session(&self) -> Result<()>;

    /// Removes tasks, queue and session.
    async fn clear_all(&self) -> Result<()>;
}
