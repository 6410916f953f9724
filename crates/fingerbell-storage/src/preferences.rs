#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Namespaced key/value store for controller state that must survive power
/// loss.
///
/// Values are strings; typed helpers cover the booleans the controller
/// persists. Every write is durable once the returned future resolves.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate.
pub trait PreferenceStore: Send + Sync {
    /// Read a value.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<String>>;

    /// Insert or replace a value.
    async fn put(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Returns whether it existed.
    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List every key in a namespace, in ascending order.
    async fn keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Delete every key in a namespace. Returns the number removed.
    async fn clear(&self, namespace: &str) -> StorageResult<u64>;

    /// Read a boolean stored as `"true"`/`"false"`.
    async fn get_bool(&self, namespace: &str, key: &str) -> StorageResult<Option<bool>> {
        match self.get(namespace, key).await? {
            None => Ok(None),
            Some(value) => match value.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(StorageError::CorruptValue {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    value,
                }),
            },
        }
    }

    /// Store a boolean as `"true"`/`"false"`.
    async fn put_bool(&self, namespace: &str, key: &str, value: bool) -> StorageResult<()> {
        self.put(namespace, key, if value { "true" } else { "false" })
            .await
    }
}

impl<T: PreferenceStore> PreferenceStore for Arc<T> {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<String>> {
        (**self).get(namespace, key).await
    }

    async fn put(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()> {
        (**self).put(namespace, key, value).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        (**self).remove(namespace, key).await
    }

    async fn keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        (**self).keys(namespace).await
    }

    async fn clear(&self, namespace: &str) -> StorageResult<u64> {
        (**self).clear(namespace).await
    }
}

fn validate_key(namespace: &str, key: &str) -> StorageResult<()> {
    if namespace.is_empty() || key.is_empty() {
        return Err(StorageError::InvalidKey {
            namespace: namespace.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

/// SQLite implementation of PreferenceStore
#[derive(Debug, Clone)]
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

impl SqlitePreferenceStore {
    /// Create a new SQLite preference store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<String>> {
        validate_key(namespace, key)?;

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT value
            FROM preferences
            WHERE namespace = ? AND key = ?
            "#,
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()> {
        validate_key(namespace, key)?;

        sqlx::query(
            r#"
            INSERT INTO preferences (namespace, key, value)
            VALUES (?, ?, ?)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!(namespace, key, "Preference stored");
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_key(namespace, key)?;

        let result = sqlx::query("DELETE FROM preferences WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT key
            FROM preferences
            WHERE namespace = ?
            ORDER BY key
            "#,
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn clear(&self, namespace: &str) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM preferences WHERE namespace = ?")
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        debug!(namespace, removed = result.rows_affected(), "Namespace cleared");
        Ok(result.rows_affected())
    }
}

/// In-memory implementation of PreferenceStore
///
/// Nothing survives the process; intended for tests and the simulator.
/// Writes can be made to fail to exercise the controller's error paths.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<BTreeMap<(String, String), String>>,
    read_only: Mutex<bool>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write while `read_only` is set.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.lock().unwrap_or_else(PoisonError::into_inner) = read_only;
    }

    /// Number of stored entries across all namespaces.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<(String, String), String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if *self.read_only.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<String>> {
        validate_key(namespace, key)?;
        Ok(self
            .entries()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()> {
        validate_key(namespace, key)?;
        self.check_writable()?;
        self.entries().insert(
            (namespace.to_string(), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_key(namespace, key)?;
        self.check_writable()?;
        Ok(self
            .entries()
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some())
    }

    async fn keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .entries()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn clear(&self, namespace: &str) -> StorageResult<u64> {
        self.check_writable()?;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(ns, _), _| ns != namespace);
        Ok((before - entries.len()) as u64)
    }
}
