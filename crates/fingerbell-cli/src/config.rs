//! Simulator configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fingerbell_engine::EngineConfig;
use fingerbell_storage::DatabaseConfig;
use serde::{Deserialize, Serialize};

/// Contents of the JSON file passed with `--config`.
///
/// Every field is optional; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub engine: EngineConfig,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            path: defaults.path.display().to_string(),
            pool_size: defaults.pool_size,
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .engine
            .validate()
            .context("Invalid engine configuration")?;
        Ok(config)
    }

    /// Storage settings, with `database` overriding the file's path.
    pub fn database_config(&self, database: Option<&Path>) -> DatabaseConfig {
        let path = database.map_or_else(|| PathBuf::from(&self.database.path), Path::to_path_buf);
        DatabaseConfig::new(path).with_pool_size(self.database.pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "engine": {{ "match_cooldown_ms": 1500, "network_identity": "porch" }} }}"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.engine.match_cooldown(), Duration::from_millis(1500));
        assert_eq!(config.engine.network_identity, "porch");
        assert_eq!(config.engine.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.database, DatabaseSection::default());
    }

    #[test]
    fn test_invalid_engine_section_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "engine": {{ "connect_attempts": 0 }} }}"#).unwrap();

        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_database_flag_overrides_file() {
        let config = FileConfig {
            database: DatabaseSection {
                path: "from-file.db".to_string(),
                pool_size: 4,
            },
            ..FileConfig::default()
        };

        let db = config.database_config(Some(Path::new("/tmp/override.db")));
        assert_eq!(db.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(db.pool_size, 4);

        assert_eq!(
            config.database_config(None).path,
            PathBuf::from("from-file.db")
        );
    }
}
