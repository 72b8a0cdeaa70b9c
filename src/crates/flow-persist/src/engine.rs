//! Interfaces shared with the workflow engine
//!
//! The engine hands entity snapshots to [`LifecycleHook`]s on every flow,
//! process and step transition, and drives suspend/recover through a
//! [`SuspendPersist`]. It exposes an [`EngineRegistry`] where the adapter
//! registers both.

use crate::error::PersistResult;
use crate::models::{Checkpoint, EntityKind, RecoverRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What the engine reports about a flow, process or step
pub trait EntitySnapshot: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Owning flow; `None` for flows themselves
    fn flow_id(&self) -> Option<&str> {
        None
    }

    /// Owning process; only steps have one
    fn process_id(&self) -> Option<&str> {
        None
    }

    fn success(&self) -> bool;

    fn suspended(&self) -> bool;

    fn start_time(&self) -> DateTime<Utc>;

    /// Set once the entity has finished
    fn end_time(&self) -> Option<DateTime<Utc>>;
}

/// Insert/update callbacks for one entity kind
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Called once when the entity begins
    async fn on_insert(&self, entity: &dyn EntitySnapshot) -> PersistResult<()>;

    /// Called on suspend and on completion
    async fn on_update(&self, entity: &dyn EntitySnapshot) -> PersistResult<()>;
}

/// Suspend/recover persistence
#[async_trait]
pub trait SuspendPersist: Send + Sync {
    /// Latest idle record for a root; `NotFound` means nothing to recover
    async fn get_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord>;

    /// Every checkpoint of one suspend event, in no particular order
    async fn list_checkpoints(&self, recover_id: &str) -> PersistResult<Vec<Checkpoint>>;

    /// Flip a record's status after the engine has rehydrated from it
    async fn update_record_status(&self, record: &RecoverRecord) -> PersistResult<()>;

    /// Write all checkpoints of one suspend event and its record atomically
    async fn save_checkpoint_and_record(
        &self,
        checkpoints: &[Checkpoint],
        record: &RecoverRecord,
    ) -> PersistResult<()>;

    /// Take the root's idle record and mark it consumed in one step
    async fn claim_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord>;
}

/// Registration points exposed by the engine
pub trait EngineRegistry {
    fn register_lifecycle(&mut self, kind: EntityKind, hook: Arc<dyn LifecycleHook>);

    fn register_suspend(&mut self, persist: Arc<dyn SuspendPersist>);
}
