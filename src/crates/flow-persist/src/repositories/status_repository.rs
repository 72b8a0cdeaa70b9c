//! Status tracking for flows, processes and steps

use crate::db::Database;
use crate::engine::EntitySnapshot;
use crate::error::{PersistError, PersistResult};
use crate::logging::Logger;
use crate::models::{EntityKind, EntityStatus, ExecutionRecord};
use crate::tables::{parent_of, EntityTable, EntityTables, ParentRef};
use chrono::Utc;
use tracing::{debug, warn};

/// Records lifecycle transitions of execution entities
///
/// One tracker serves all three kinds; the [`EntityTables`] mapping decides
/// which table and parent columns a call touches.
#[derive(Clone, Debug)]
pub struct StatusTracker {
    db: Database,
    tables: EntityTables,
    logger: Logger,
}

impl StatusTracker {
    pub fn new(db: Database, tables: EntityTables, logger: Logger) -> Self {
        Self {
            db,
            tables,
            logger: logger.for_component("status_tracker"),
        }
    }

    pub fn tables(&self) -> &EntityTables {
        &self.tables
    }

    /// Insert a new row with status `Begin`
    ///
    /// Fails with [`PersistError::WriteConflict`] when the id is already taken.
    /// Ids are unique engine-wide, so a conflict is never retried.
    pub async fn insert(&self, kind: EntityKind, entity: &dyn EntitySnapshot) -> PersistResult<()> {
        self.logger
            .scope("insert", self.insert_inner(self.tables.get(kind), entity))
            .await
    }

    async fn insert_inner(&self, table: &EntityTable, entity: &dyn EntitySnapshot) -> PersistResult<()> {
        let started = entity.start_time().to_rfc3339();

        let mut columns = vec!["id", "name", "status"];
        columns.extend(table.parents.iter().map(|p| p.column));
        columns.extend(["created_at", "updated_at"]);
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.table,
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(entity.id())
            .bind(entity.name())
            .bind(EntityStatus::Begin.as_i64());
        for parent in &table.parents {
            let value = match parent.parent {
                ParentRef::Flow => entity.flow_id(),
                ParentRef::Process => entity.process_id(),
            };
            query = query.bind(value);
        }
        query
            .bind(&started)
            .bind(&started)
            .execute(self.db.pool())
            .await
            .map_err(|e| PersistError::from_insert(e, table.kind.as_str(), entity.id()))?;

        debug!(kind = %table.kind, id = %entity.id(), "Inserted entity");
        Ok(())
    }

    /// Patch status, updated time and finished time
    ///
    /// Name and created time are never touched. Only rows still in `Begin` or
    /// `Suspend` are updated; a terminal row yields
    /// [`PersistError::InvalidTransition`]. Returns the status written.
    pub async fn update(&self, kind: EntityKind, entity: &dyn EntitySnapshot) -> PersistResult<EntityStatus> {
        self.logger
            .scope("update", self.update_inner(self.tables.get(kind), entity))
            .await
    }

    async fn update_inner(&self, table: &EntityTable, entity: &dyn EntitySnapshot) -> PersistResult<EntityStatus> {
        let status = EntityStatus::derive(entity.success(), entity.suspended());
        let now = Utc::now().to_rfc3339();
        let finished = entity.end_time().map(|t| t.to_rfc3339());

        let sql = format!(
            "UPDATE {} SET status = ?, updated_at = ?, finished_at = COALESCE(?, finished_at)
             WHERE id = ? AND status IN (?, ?)",
            table.table
        );
        let [begin, suspend] = EntityStatus::UPDATABLE;
        let result = sqlx::query(&sql)
            .bind(status.as_i64())
            .bind(&now)
            .bind(&finished)
            .bind(entity.id())
            .bind(begin.as_i64())
            .bind(suspend.as_i64())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_update(table, entity.id(), status).await?);
        }

        debug!(kind = %table.kind, id = %entity.id(), status = %status, "Updated entity");
        Ok(status)
    }

    /// Explain why a conditional update matched nothing
    async fn rejected_update(
        &self,
        table: &EntityTable,
        id: &str,
        to: EntityStatus,
    ) -> PersistResult<PersistError> {
        let sql = format!("SELECT status FROM {} WHERE id = ?", table.table);
        let current: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(match current {
            None => PersistError::not_found(format!("{} {}", table.kind, id)),
            Some((code,)) => {
                let from = EntityStatus::from_i64(code)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| code.to_string());
                warn!(kind = %table.kind, id = %id, from = %from, to = %to, "Rejected update of finished entity");
                PersistError::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to: to.to_string(),
                }
            }
        })
    }

    /// Read one record back
    pub async fn get(&self, kind: EntityKind, id: &str) -> PersistResult<Option<ExecutionRecord>> {
        let table = self.tables.get(kind);
        let sql = format!("SELECT {} FROM {} WHERE id = ?", table.select_list(), table.table);
        Ok(sqlx::query_as::<_, ExecutionRecord>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?)
    }

    /// Processes of a flow, or steps of a process, oldest first
    pub async fn list_children(&self, kind: EntityKind, parent_id: &str) -> PersistResult<Vec<ExecutionRecord>> {
        let table = self.tables.get(kind);
        let column = parent_of(kind)
            .and_then(|parent| table.parent_column(parent))
            .ok_or_else(|| PersistError::invalid_input(format!("{} entities have no parent", kind)))?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY created_at ASC",
            table.select_list(),
            table.table,
            column
        );
        Ok(sqlx::query_as::<_, ExecutionRecord>(&sql)
            .bind(parent_id)
            .fetch_all(self.db.pool())
            .await?)
    }
}
