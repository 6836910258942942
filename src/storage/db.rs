use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use super::DurableStore;
use crate::config::StorageConfig;
use crate::constants::{STORAGE_KEY_PENDING_SYNC, STORAGE_KEY_SESSION, STORAGE_KEY_TASKS};
use crate::entities::kv_entry;
use crate::queue::PendingQueue;
use crate::repositories::KvRepository;
use crate::session::Session;
use crate::task::Task;

/// SQLite-backed durable store.
pub struct LocalStorage {
    pub(crate) conn: DatabaseConnection,
}

impl LocalStorage {
    /// Opens (or creates) the database file at `path`.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        info!("💾 Opening task database at {}", path.display());
        Self::connect(&url).await
    }

    /// Creates a throwaway in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Opens the store described by the storage section of the configuration.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        if config.in_memory {
            return Self::in_memory().await;
        }
        let path = config.resolve_database_path()?;
        Self::open(path).await
    }

    async fn connect(url: &str) -> Result<Self> {
        // A single connection keeps in-memory databases alive and serializes writes.
        let mut options = ConnectOptions::new(url.to_string());
        options
            .min_connections(1)
            .max_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .with_context(|| format!("Failed to connect to database: {url}"))?;

        let storage = LocalStorage { conn };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        let stmt = schema
            .create_table_from_entity(kv_entry::Entity)
            .if_not_exists()
            .to_owned();
        self.conn.execute(backend.build(&stmt)).await?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match KvRepository::get(&self.conn, key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).with_context(|| format!("Corrupt value stored under '{key}'"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).with_context(|| format!("Failed to serialize '{key}'"))?;
        KvRepository::set(&self.conn, key, raw).await
    }
}

#[async_trait]
impl DurableStore for LocalStorage {
    async fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read(STORAGE_KEY_TASKS).await?.unwrap_or_default())
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write(STORAGE_KEY_TASKS, tasks).await
    }

    async fn load_queue(&self) -> Result<PendingQueue> {
        Ok(self.read(STORAGE_KEY_PENDING_SYNC).await?.unwrap_or_default())
    }

    async fn save_queue(&self, queue: &PendingQueue) -> Result<()> {
        self.write(STORAGE_KEY_PENDING_SYNC, queue).await
    }

    async fn load_session(&self) -> Result<Option<Session>> {
        match self.read(STORAGE_KEY_SESSION).await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("⚠️  Discarding unreadable stored session: {e:#}");
                KvRepository::remove(&self.conn, STORAGE_KEY_SESSION).await?;
                Ok(None)
            }
        }
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        self.write(STORAGE_KEY_SESSION, session).await
    }

    async fn clear_session(&self) -> Result<()> {
        KvRepository::remove(&self.conn, STORAGE_KEY_SESSION).await
    }

    async fn clear_all(&self) -> Result<()> {
        KvRepository::remove_all(
            &self.conn,
            &[STORAGE_KEY_TASKS, STORAGE_KEY_PENDING_SYNC, STORAGE_KEY_SESSION],
        )
        .await
    }
}
