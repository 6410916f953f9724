//! Integration tests for the SQLite preference store
//!
//! Run with: cargo test --package fingerbell-storage --test integration_preferences

use fingerbell_storage::{Database, DatabaseConfig, PreferenceStore, StorageError};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Database {
    let path = dir.path().join("prefs").join("fingerbell.db");
    Database::new(DatabaseConfig::new(path))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.ping().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db.migrate().await.unwrap();
    db.ping().await.unwrap();
}

#[tokio::test]
async fn test_put_overwrites_existing_value() {
    let db = Database::in_memory().await.unwrap();
    let prefs = db.preferences();

    prefs.put("fingerprints", "5", "Alice").await.unwrap();
    prefs.put("fingerprints", "5", "Bob").await.unwrap();

    assert_eq!(
        prefs.get("fingerprints", "5").await.unwrap().as_deref(),
        Some("Bob")
    );
    assert_eq!(prefs.keys("fingerprints").await.unwrap(), vec!["5"]);
}

#[tokio::test]
async fn test_clear_only_touches_one_namespace() {
    let db = Database::in_memory().await.unwrap();
    let prefs = db.preferences();

    prefs.put("fingerprints", "1", "Alice").await.unwrap();
    prefs.put("fingerprints", "2", "Bob").await.unwrap();
    prefs.put_bool("pairing", "pairing_valid", true).await.unwrap();

    assert_eq!(prefs.clear("fingerprints").await.unwrap(), 2);
    assert!(prefs.keys("fingerprints").await.unwrap().is_empty());
    assert_eq!(
        prefs.get_bool("pairing", "pairing_valid").await.unwrap(),
        Some(true)
    );
}

#[tokio::test]
async fn test_remove_reports_presence() {
    let db = Database::in_memory().await.unwrap();
    let prefs = db.preferences();

    prefs.put("fingerprints", "7", "Carol").await.unwrap();
    assert!(prefs.remove("fingerprints", "7").await.unwrap());
    assert!(!prefs.remove("fingerprints", "7").await.unwrap());
    assert_eq!(prefs.get("fingerprints", "7").await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let db = Database::in_memory().await.unwrap();
    let prefs = db.preferences();

    let err = prefs.put("fingerprints", "", "x").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey { .. }));
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let db = open(&dir).await;
        let prefs = db.preferences();
        prefs.put("fingerprints", "12", "Dave").await.unwrap();
        prefs
            .put("pairing", "pairing_code", "00112233445566778899aabbccddeeff")
            .await
            .unwrap();
        prefs.put_bool("pairing", "pairing_valid", false).await.unwrap();
        db.close().await;
    }

    let db = open(&dir).await;
    let prefs = db.preferences();

    assert_eq!(
        prefs.get("fingerprints", "12").await.unwrap().as_deref(),
        Some("Dave")
    );
    assert_eq!(
        prefs.get("pairing", "pairing_code").await.unwrap().as_deref(),
        Some("00112233445566778899aabbccddeeff")
    );
    assert_eq!(
        prefs.get_bool("pairing", "pairing_valid").await.unwrap(),
        Some(false)
    );
}
