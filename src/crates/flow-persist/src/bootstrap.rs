//! Schema bootstrap
//!
//! Creates the status and recovery tables when they are missing. Safe to run
//! from several processes at once: a create that loses the race is detected by
//! re-reading the table inventory and reported as
//! [`PersistError::AlreadyExists`], which bootstrap treats as success.

use crate::config::TableConfig;
use crate::db::Database;
use crate::error::{PersistError, PersistResult};
use crate::logging::Logger;
use crate::tables::{EntityTable, EntityTables};
use std::collections::HashSet;
use tracing::{debug, info};

/// Provisions the five persisted tables
#[derive(Clone, Debug)]
pub struct SchemaBootstrap {
    db: Database,
    tables: TableConfig,
    entity_tables: EntityTables,
    logger: Logger,
}

impl SchemaBootstrap {
    pub fn new(db: Database, tables: TableConfig, logger: Logger) -> Self {
        Self {
            db,
            entity_tables: EntityTables::new(&tables),
            tables,
            logger: logger.for_component("schema_bootstrap"),
        }
    }

    /// Create every missing table, then make sure the indexes exist
    pub async fn run(&self) -> PersistResult<()> {
        self.logger.scope("bootstrap", self.run_inner()).await
    }

    async fn run_inner(&self) -> PersistResult<()> {
        let existing = self.existing_tables().await?;
        let missing: Vec<(String, String)> = self
            .table_definitions()
            .into_iter()
            .filter(|(table, _)| !existing.contains(table))
            .collect();

        if missing.is_empty() {
            debug!("All tables present");
        }

        for (table, ddl) in &missing {
            match self.create_table(table, ddl).await {
                Ok(()) => {}
                Err(PersistError::AlreadyExists(table)) => {
                    debug!(table = %table, "Table created concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        for statement in self.index_definitions() {
            sqlx::query(&statement).execute(self.db.pool()).await?;
        }

        Ok(())
    }

    /// Names of the tables currently in the database
    pub async fn existing_tables(&self) -> PersistResult<HashSet<String>> {
        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(self.db.pool())
                .await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_exists(&self, table: &str) -> PersistResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.is_some())
    }

    /// Run one CREATE TABLE, classifying a lost race as `AlreadyExists`
    pub(crate) async fn create_table(&self, table: &str, ddl: &str) -> PersistResult<()> {
        match sqlx::query(ddl).execute(self.db.pool()).await {
            Ok(_) => {
                info!(table = %table, "Created table");
                Ok(())
            }
            Err(source) => {
                if self.table_exists(table).await? {
                    Err(PersistError::AlreadyExists(table.to_string()))
                } else {
                    Err(PersistError::Schema {
                        table: table.to_string(),
                        source,
                    })
                }
            }
        }
    }

    fn table_definitions(&self) -> Vec<(String, String)> {
        let mut defs: Vec<(String, String)> = self
            .entity_tables
            .iter()
            .map(|t| (t.table.clone(), entity_table_ddl(t)))
            .collect();

        defs.push((
            self.tables.recover_record.clone(),
            format!(
                "CREATE TABLE {} (
                    recover_id CHAR(36) PRIMARY KEY NOT NULL,
                    root_uid CHAR(36) NOT NULL,
                    status INTEGER NOT NULL DEFAULT 0 CHECK (status IN (0, 1)),
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                self.tables.recover_record
            ),
        ));

        defs.push((
            self.tables.checkpoint.clone(),
            format!(
                "CREATE TABLE {} (
                    id CHAR(36) PRIMARY KEY NOT NULL,
                    uid CHAR(36) NOT NULL,
                    name TEXT NOT NULL,
                    recover_id CHAR(36) NOT NULL,
                    parent_uid CHAR(36) NOT NULL DEFAULT '',
                    root_uid CHAR(36) NOT NULL DEFAULT '',
                    scope INTEGER NOT NULL,
                    snapshot BLOB NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                self.tables.checkpoint
            ),
        ));

        defs
    }

    fn index_definitions(&self) -> Vec<String> {
        let mut statements = Vec::new();

        for table in self.entity_tables.iter() {
            for parent in &table.parents {
                statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS idx_{t}_{c} ON {t} ({c})",
                    t = table.table,
                    c = parent.column
                ));
            }
        }

        // At most one idle record per root
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_{t}_idle_root ON {t} (root_uid) WHERE status = 0",
            t = self.tables.recover_record
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_recover_id ON {t} (recover_id)",
            t = self.tables.checkpoint
        ));

        statements
    }
}

fn entity_table_ddl(table: &EntityTable) -> String {
    let parents: String = table
        .parents
        .iter()
        .map(|p| format!("{} CHAR(36),\n", p.column))
        .collect();

    format!(
        "CREATE TABLE {} (
            id CHAR(36) PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            status INTEGER NOT NULL DEFAULT 0 CHECK (status IN (0, 1, 2, 3)),
            {}created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            finished_at TEXT
        )",
        table.table, parents
    )
}
