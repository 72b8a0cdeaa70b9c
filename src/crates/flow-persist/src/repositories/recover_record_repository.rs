//! Recovery coordinator: finding and consuming suspend points

use crate::config::TableConfig;
use crate::db::Database;
use crate::error::{PersistError, PersistResult};
use crate::logging::Logger;
use crate::models::{Checkpoint, RecoverRecord, RecoverStatus};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Looks up the idle recovery record of a root and consumes it
///
/// A record goes `Idle -> Consumed` exactly once. Both the status flip and the
/// claim are conditional writes, so two recoveries of the same root can never
/// both succeed.
#[derive(Clone, Debug)]
pub struct RecoveryCoordinator {
    db: Database,
    checkpoint_table: String,
    record_table: String,
    logger: Logger,
}

impl RecoveryCoordinator {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            db,
            checkpoint_table: tables.checkpoint.clone(),
            record_table: tables.recover_record.clone(),
            logger: logger.for_component("recovery_coordinator"),
        }
    }

    /// The idle record of `root_uid`
    ///
    /// [`PersistError::NotFound`] means there is nothing to recover.
    pub async fn get_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord> {
        let sql = format!(
            "SELECT * FROM {} WHERE root_uid = ? AND status = ? ORDER BY created_at DESC LIMIT 1",
            self.record_table
        );
        sqlx::query_as::<_, RecoverRecord>(&sql)
            .bind(root_uid)
            .bind(RecoverStatus::Idle.as_i64())
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| PersistError::not_found(format!("idle recover record for root {}", root_uid)))
    }

    /// All checkpoints of a suspend event, unordered
    pub async fn list_checkpoints(&self, recover_id: &str) -> PersistResult<Vec<Checkpoint>> {
        let sql = format!("SELECT * FROM {} WHERE recover_id = ?", self.checkpoint_table);
        Ok(sqlx::query_as::<_, Checkpoint>(&sql)
            .bind(recover_id)
            .fetch_all(self.db.pool())
            .await?)
    }

    /// A record by key, whatever its status
    pub async fn find_record(&self, recover_id: &str) -> PersistResult<Option<RecoverRecord>> {
        let sql = format!("SELECT * FROM {} WHERE recover_id = ?", self.record_table);
        Ok(sqlx::query_as::<_, RecoverRecord>(&sql)
            .bind(recover_id)
            .fetch_optional(self.db.pool())
            .await?)
    }

    /// Apply `record.status` to the stored record
    ///
    /// Only `Idle -> Consumed` changes anything. The write matches the row only
    /// while it is still idle, so a second consumer gets
    /// [`PersistError::InvalidTransition`].
    pub async fn update_record_status(&self, record: &RecoverRecord) -> PersistResult<()> {
        self.logger
            .scope("update_record_status", self.update_status_inner(record))
            .await
    }

    async fn update_status_inner(&self, record: &RecoverRecord) -> PersistResult<()> {
        let target = record.recover_status().ok_or_else(|| {
            PersistError::invalid_input(format!("unknown recover status {}", record.status))
        })?;

        if target == RecoverStatus::Consumed {
            let sql = format!(
                "UPDATE {} SET status = ?, updated_at = ? WHERE recover_id = ? AND status = ?",
                self.record_table
            );
            let result = sqlx::query(&sql)
                .bind(RecoverStatus::Consumed.as_i64())
                .bind(Utc::now().to_rfc3339())
                .bind(&record.recover_id)
                .bind(RecoverStatus::Idle.as_i64())
                .execute(self.db.pool())
                .await?;

            if result.rows_affected() == 1 {
                info!(recover_id = %record.recover_id, root_uid = %record.root_uid, "Recover record consumed");
                return Ok(());
            }
        }

        let current = self
            .find_record(&record.recover_id)
            .await?
            .ok_or_else(|| PersistError::not_found(format!("recover record {}", record.recover_id)))?;
        let from = current.recover_status().unwrap_or(RecoverStatus::Consumed);

        if from == target {
            if target == RecoverStatus::Idle {
                return Ok(());
            }
            warn!(recover_id = %record.recover_id, "Recover record already consumed");
        }
        Err(PersistError::InvalidTransition {
            id: record.recover_id.clone(),
            from: from.to_string(),
            to: target.to_string(),
        })
    }

    /// Atomically take the idle record of `root_uid`
    ///
    /// Flips the record to `Consumed` and returns it in a single statement.
    /// Concurrent claims on one root yield exactly one winner; the others, like
    /// a root with nothing to recover, get [`PersistError::NotFound`].
    pub async fn claim_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord> {
        self.logger
            .scope("claim_latest_record", self.claim_inner(root_uid))
            .await
    }

    async fn claim_inner(&self, root_uid: &str) -> PersistResult<RecoverRecord> {
        let sql = format!(
            "UPDATE {t} SET status = ?, updated_at = ?
             WHERE status = ? AND recover_id = (
                 SELECT recover_id FROM {t} WHERE root_uid = ? AND status = ?
                 ORDER BY created_at DESC LIMIT 1
             )
             RETURNING *",
            t = self.record_table
        );
        let claimed = sqlx::query_as::<_, RecoverRecord>(&sql)
            .bind(RecoverStatus::Consumed.as_i64())
            .bind(Utc::now().to_rfc3339())
            .bind(RecoverStatus::Idle.as_i64())
            .bind(root_uid)
            .bind(RecoverStatus::Idle.as_i64())
            .fetch_optional(self.db.pool())
            .await?;

        match claimed {
            Some(record) => {
                info!(recover_id = %record.recover_id, root_uid = %root_uid, "Claimed recover record");
                Ok(record)
            }
            None => {
                debug!(root_uid = %root_uid, "Nothing to claim");
                Err(PersistError::not_found(format!("idle recover record for root {}", root_uid)))
            }
        }
    }
}
