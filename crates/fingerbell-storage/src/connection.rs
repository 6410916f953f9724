//! SQLite database holding the controller's preferences.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::preferences::SqlitePreferenceStore;

/// Where and how to open the preference database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,

    /// Pool size. Preference traffic is a handful of writes per command, so
    /// one or two connections suffice.
    pub pool_size: u32,

    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,

    pub create_if_missing: bool,

    /// Apply embedded migrations when opening.
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fingerbell.db"),
            pool_size: 2,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn auto_migrate(mut self, migrate: bool) -> Self {
        self.auto_migrate = migrate;
        self
    }

    fn validate(&self) -> StorageResult<()> {
        if self.pool_size == 0 {
            return Err(StorageError::Configuration(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(StorageError::Configuration(
                "database path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// An open preference database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and by default create and migrate) the database at `config.path`.
    ///
    /// Every connection runs in WAL mode with `synchronous = FULL`, so a
    /// write is durable once its future resolves.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fingerbell_storage::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new(DatabaseConfig::new("/var/lib/fingerbell/prefs.db")).await?;
    /// let prefs = db.preferences();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        config.validate()?;

        if config.create_if_missing {
            ensure_parent_dir(&config.path)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await?;

        info!(path = %config.path.display(), "Opened preference database");

        let db = Self { pool };
        if config.auto_migrate {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// A migrated database that lives only as long as the pool.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .disable_statement_logging();

        // Each connection to `:memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the embedded migrations. Already-applied ones are skipped.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Preference database migrations applied");
        Ok(())
    }

    /// A preference store sharing this database's pool.
    pub fn preferences(&self) -> SqlitePreferenceStore {
        SqlitePreferenceStore::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|e| StorageError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new("prefs.db")
            .with_pool_size(1)
            .with_busy_timeout(Duration::from_millis(250))
            .create_if_missing(false)
            .auto_migrate(false);

        assert_eq!(config.path, PathBuf::from("prefs.db"));
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.create_if_missing);
        assert!(!config.auto_migrate);
    }

    #[test]
    fn test_config_defaults() {
        let config = DatabaseConfig::default();

        assert_eq!(config.path, PathBuf::from("fingerbell.db"));
        assert_eq!(config.pool_size, 2);
        assert!(config.create_if_missing);
        assert!(config.auto_migrate);
    }

    #[tokio::test]
    async fn test_empty_pool_rejected() {
        let result = Database::new(DatabaseConfig::new("unused.db").with_pool_size(0)).await;
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let result = Database::new(DatabaseConfig::new("")).await;
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}
