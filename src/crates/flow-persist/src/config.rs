//! Adapter configuration
//!
//! A TOML file provides the database url, pool size, log settings and table
//! names; environment variables override the url and log level.

mod loader;
mod schema;

pub use loader::{ConfigLoader, ENV_DATABASE_URL, ENV_LOG_LEVEL};
pub use schema::{DatabaseConfig, LoggingConfig, PersistConfig, TableConfig};

use crate::error::PersistResult;
use std::path::Path;

/// Load configuration from an optional file plus the environment
pub async fn load_config(path: Option<&Path>) -> PersistResult<PersistConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    loader.load().await
}
