//! Configuration loader
//!
//! Loads configuration from:
//! 1. Default values
//! 2. A TOML file, when one is given and exists
//! 3. Environment overrides (`FLOW_PERSIST_DATABASE_URL`, `FLOW_PERSIST_LOG_LEVEL`)
//!
//! Later sources override earlier ones. The result is validated before it is returned.

use crate::config::schema::PersistConfig;
use crate::error::{PersistError, PersistResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable overriding `database.url`
pub const ENV_DATABASE_URL: &str = "FLOW_PERSIST_DATABASE_URL";

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "FLOW_PERSIST_LOG_LEVEL";

/// Configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that uses defaults and the environment only
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that also reads the given TOML file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load, override and validate the configuration
    pub async fn load(&self) -> PersistResult<PersistConfig> {
        let mut config = PersistConfig::default();

        if let Some(path) = &self.config_path {
            if path.exists() {
                config.merge(Self::load_from_path(path).await?);
                debug!(path = %path.display(), "Loaded config file");
            } else {
                debug!(path = %path.display(), "Config file not found, using defaults");
            }
        }

        config.resolve_env_vars();
        Self::apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Parse one TOML file
    pub async fn load_from_path(path: &Path) -> PersistResult<PersistConfig> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PersistError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PersistError::Config(format!("Failed to parse config: {}", e)))
    }

    fn apply_env_overrides(config: &mut PersistConfig) {
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            debug!("Database url overridden from environment");
            config.database.url = url;
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flow-persist.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            url = "sqlite:custom.db"
            max_connections = 2

            [tables]
            flow = "wf_flows"
            process = "wf_processes"
            step = "wf_steps"
            checkpoint = "wf_checkpoints"
            recover_record = "wf_recover_records"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).await.unwrap();
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.tables.flow, "wf_flows");
    }

    #[tokio::test]
    async fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[database\nurl = ").unwrap();

        let result = ConfigLoader::load_from_path(&path).await;
        assert!(matches!(result, Err(PersistError::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_table_name_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad-tables.toml");
        std::fs::write(
            &path,
            r#"
            [tables]
            flow = "flows--"
            process = "processes"
            step = "steps"
            checkpoint = "checkpoints"
            recover_record = "recover_records"
            "#,
        )
        .unwrap();

        let result = ConfigLoader::with_path(&path).load().await;
        assert!(matches!(result, Err(PersistError::Config(_))));
    }
}
