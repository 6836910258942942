//! Key-value repository for database operations.

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::kv_entry;

/// Repository for raw key-value access.
pub struct KvRepository;

impl KvRepository {
    /// Get the raw value stored under `key`.
    pub async fn get<C>(conn: &C, key: &str) -> Result<Option<String>>
    where
        C: ConnectionTrait,
    {
        Ok(kv_entry::Entity::find_by_id(key.to_string())
            .one(conn)
            .await?
            .map(|entry| entry.value))
    }

    /// Insert or replace the value stored under `key`.
    pub async fn set<C>(conn: &C, key: &str, value: String) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let entry = kv_entry::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value),
            updated_at: ActiveValue::Set(Utc::now()),
        };

        kv_entry::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(kv_entry::Column::Key)
                    .update_columns([kv_entry::Column::Value, kv_entry::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Remove `key`. Missing keys are ignored.
    pub async fn remove<C>(conn: &C, key: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        kv_entry::Entity::delete_many()
            .filter(kv_entry::Column::Key.eq(key))
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Remove every key in `keys`.
    pub async fn remove_all<C>(conn: &C, keys: &[&str]) -> Result<()>
    where
        C: ConnectionTrait,
    {
        kv_entry::Entity::delete_many()
            .filter(kv_entry::Column::Key.is_in(keys.iter().copied()))
            .exec(conn)
            .await?;
        Ok(())
    }
}
