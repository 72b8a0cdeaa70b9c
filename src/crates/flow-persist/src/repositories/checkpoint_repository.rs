//! Checkpoint store: atomic persistence of a suspend point

use crate::config::TableConfig;
use crate::db::Database;
use crate::error::{PersistError, PersistResult, TransactionStage};
use crate::logging::Logger;
use crate::models::{Checkpoint, RecoverRecord};
use sqlx::{Sqlite, Transaction};
use tracing::{info, warn};

/// Writes the checkpoints of one suspend event together with its recovery record
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    db: Database,
    checkpoint_table: String,
    record_table: String,
    logger: Logger,
}

impl CheckpointStore {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            db,
            checkpoint_table: tables.checkpoint.clone(),
            record_table: tables.recover_record.clone(),
            logger: logger.for_component("checkpoint_store"),
        }
    }

    /// Persist `checkpoints` and `record` as one transaction
    ///
    /// Either every row becomes visible or none does. Any failure is returned
    /// as [`PersistError::TransactionFailure`] after the transaction has been
    /// rolled back; nothing is retried.
    pub async fn save_checkpoint_and_record(
        &self,
        checkpoints: &[Checkpoint],
        record: &RecoverRecord,
    ) -> PersistResult<()> {
        self.logger
            .scope("save_checkpoint_and_record", self.save_inner(checkpoints, record))
            .await
    }

    async fn save_inner(&self, checkpoints: &[Checkpoint], record: &RecoverRecord) -> PersistResult<()> {
        Self::validate(checkpoints, record)?;

        let fail = |stage: TransactionStage| {
            let recover_id = record.recover_id.clone();
            move |source: sqlx::Error| PersistError::TransactionFailure {
                recover_id,
                stage,
                source,
            }
        };

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(fail(TransactionStage::Begin))?;

        if let Err(err) = self.stage(&mut tx, checkpoints, record).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(recover_id = %record.recover_id, error = %rollback_err, "Rollback failed");
            }
            warn!(recover_id = %record.recover_id, error = %err, "Suspend point not persisted");
            return Err(err);
        }

        tx.commit().await.map_err(fail(TransactionStage::Commit))?;

        info!(
            recover_id = %record.recover_id,
            root_uid = %record.root_uid,
            checkpoints = checkpoints.len(),
            "Saved suspend point"
        );
        Ok(())
    }

    /// Insert every row inside the open transaction
    async fn stage(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        checkpoints: &[Checkpoint],
        record: &RecoverRecord,
    ) -> PersistResult<()> {
        let failure = |stage: TransactionStage, source: sqlx::Error| PersistError::TransactionFailure {
            recover_id: record.recover_id.clone(),
            stage,
            source,
        };

        let insert_checkpoint = format!(
            "INSERT INTO {} (id, uid, name, recover_id, parent_uid, root_uid, scope, snapshot, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.checkpoint_table
        );
        for cp in checkpoints {
            sqlx::query(&insert_checkpoint)
                .bind(&cp.id)
                .bind(&cp.uid)
                .bind(&cp.name)
                .bind(&cp.recover_id)
                .bind(&cp.parent_uid)
                .bind(&cp.root_uid)
                .bind(cp.scope)
                .bind(&cp.snapshot)
                .bind(&cp.created_at)
                .bind(&cp.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(|source| failure(TransactionStage::Checkpoint, source))?;
        }

        let insert_record = format!(
            "INSERT INTO {} (recover_id, root_uid, status, name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.record_table
        );
        sqlx::query(&insert_record)
            .bind(&record.recover_id)
            .bind(&record.root_uid)
            .bind(record.status)
            .bind(&record.name)
            .bind(&record.created_at)
            .bind(&record.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|source| failure(TransactionStage::Record, source))?;

        Ok(())
    }

    fn validate(checkpoints: &[Checkpoint], record: &RecoverRecord) -> PersistResult<()> {
        if !record.is_idle() {
            return Err(PersistError::invalid_input(format!(
                "recover record {} must be saved as Idle",
                record.recover_id
            )));
        }
        if let Some(cp) = checkpoints.iter().find(|cp| cp.recover_id != record.recover_id) {
            return Err(PersistError::invalid_input(format!(
                "checkpoint {} belongs to recover id {}, not {}",
                cp.id, cp.recover_id, record.recover_id
            )));
        }
        Ok(())
    }

    /// Number of checkpoint rows stored for a recover id
    pub async fn count_checkpoints(&self, recover_id: &str) -> PersistResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE recover_id = ?", self.checkpoint_table);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(recover_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}
