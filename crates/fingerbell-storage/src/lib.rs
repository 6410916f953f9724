//! Persistent preference storage for the fingerprint doorbell controller.
//!
//! The controller keeps two small pieces of state that must survive power
//! loss and be readable before the sensor link comes up: the template
//! id→name map and the pairing record. Both live in a namespaced key/value
//! store.
//!
//! - [`Database`] - SQLite connection pool with embedded migrations
//! - [`PreferenceStore`] - namespaced key/value contract
//! - [`SqlitePreferenceStore`] - durable implementation over [`Database`]
//! - [`MemoryPreferenceStore`] - volatile implementation for tests and the simulator
//!
//! # Examples
//!
//! ```no_run
//! use fingerbell_storage::{Database, DatabaseConfig, PreferenceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("fingerbell.db")).await?;
//! let prefs = db.preferences();
//!
//! prefs.put("fingerprints", "5", "Alice").await?;
//! assert_eq!(prefs.get("fingerprints", "5").await?.as_deref(), Some("Alice"));
//! # Ok(())
//! # }
//! ```
//!
//! # Durability
//!
//! Connections run in WAL mode with `synchronous = FULL`; a write is on disk
//! once its future resolves. All queries are parameterized.

pub mod connection;
pub mod error;
pub mod preferences;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use preferences::{MemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore};
