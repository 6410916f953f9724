use thiserror::Error;

/// Errors raised by the preference store.
///
/// The controller treats any of them as a failed write or read; callers
/// decide whether the in-memory state still moves forward.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Empty namespace or key.
    #[error("Invalid preference key {namespace:?}/{key:?}")]
    InvalidKey { namespace: String, key: String },

    /// A stored value does not parse as the requested type.
    #[error("Corrupt value for {namespace}/{key}: {value}")]
    CorruptValue {
        namespace: String,
        key: String,
        value: String,
    },

    /// The store refuses writes.
    #[error("Preference store is read-only")]
    ReadOnly,

    /// The database file could not be prepared.
    #[error("Cannot open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
