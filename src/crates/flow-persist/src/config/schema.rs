//! Configuration schema for the persistence adapter

use crate::error::{PersistError, PersistResult};
use crate::models::EntityKind;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Main adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Table names
    #[serde(default)]
    pub tables: TableConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string (e.g. "sqlite:flow.db" or "sqlite::memory:")
    pub url: String,

    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:flow-persist.db?mode=rwc".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or env-filter directive: "info", "flow_persist=debug", ...
    pub level: String,

    /// Log format: "compact", "pretty", "full"
    pub format: String,

    /// Enable colored output
    #[serde(default = "default_colored")]
    pub colored: bool,
}

fn default_colored() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            colored: default_colored(),
        }
    }
}

/// Names of the five persisted tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub flow: String,
    pub process: String,
    pub step: String,
    pub checkpoint: String,
    pub recover_record: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            flow: "flows".to_string(),
            process: "processes".to_string(),
            step: "steps".to_string(),
            checkpoint: "checkpoints".to_string(),
            recover_record: "recover_records".to_string(),
        }
    }
}

impl TableConfig {
    /// Status table name for an entity kind
    pub fn entity_table(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Flow => &self.flow,
            EntityKind::Process => &self.process,
            EntityKind::Step => &self.step,
        }
    }

    /// All configured names, in bootstrap order
    pub fn all(&self) -> [&str; 5] {
        [
            &self.flow,
            &self.process,
            &self.step,
            &self.recover_record,
            &self.checkpoint,
        ]
    }
}

impl PersistConfig {
    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: PersistConfig) {
        // serde fills in defaults for missing sections
        self.database = other.database;
        self.logging = other.logging;
        self.tables = other.tables;
    }

    /// Resolve `${VAR_NAME}` references in the database url
    pub fn resolve_env_vars(&mut self) {
        self.database.url = Self::expand_env_var(&self.database.url);
    }

    fn expand_env_var(value: &str) -> String {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            std::env::var(var_name).unwrap_or_else(|_| value.to_string())
        } else {
            value.to_string()
        }
    }

    /// Validate the configuration
    ///
    /// Table names are spliced into SQL, so each must be a plain identifier
    /// and all five must be distinct.
    pub fn validate(&self) -> PersistResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(PersistError::Config("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(PersistError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
            .map_err(|e| PersistError::Config(format!("Invalid identifier pattern: {}", e)))?;
        let names = self.tables.all();
        for (i, name) in names.iter().enumerate() {
            if !ident.is_match(name) {
                return Err(PersistError::Config(format!("Invalid table name: {:?}", name)));
            }
            if names[..i].iter().any(|other| other.eq_ignore_ascii_case(name)) {
                return Err(PersistError::Config(format!("Duplicate table name: {}", name)));
            }
        }

        match self.logging.format.as_str() {
            "compact" | "pretty" | "full" => Ok(()),
            other => Err(PersistError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PersistConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tables.entity_table(EntityKind::Step), "steps");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_rejects_injected_table_name() {
        let mut config = PersistConfig::default();
        config.tables.flow = "flows; DROP TABLE steps".to_string();
        assert!(matches!(config.validate(), Err(PersistError::Config(_))));
    }

    #[test]
    fn test_rejects_duplicate_table_names() {
        let mut config = PersistConfig::default();
        config.tables.process = "FLOWS".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = PersistConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PersistConfig = toml::from_str(
            r#"
            [database]
            url = "sqlite::memory:"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.tables.recover_record, "recover_records");
        assert_eq!(config.logging.level, "info");
    }
}
