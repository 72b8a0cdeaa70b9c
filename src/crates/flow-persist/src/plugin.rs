//! Engine integration
//!
//! [`PersistPlugin`] registers status tracking for flows, processes and steps;
//! [`SuspendPlugin`] registers suspend/recover persistence. Both bootstrap the
//! schema first and register nothing if that fails. [`Persistence`] wires
//! everything from a [`PersistConfig`].

use crate::bootstrap::SchemaBootstrap;
use crate::config::{PersistConfig, TableConfig};
use crate::db::Database;
use crate::engine::{EngineRegistry, EntitySnapshot, LifecycleHook, SuspendPersist};
use crate::error::PersistResult;
use crate::logging::Logger;
use crate::models::{Checkpoint, EntityKind, RecoverRecord};
use crate::repositories::{CheckpointStore, RecoveryCoordinator, StatusTracker};
use crate::tables::EntityTables;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Lifecycle hook bound to one entity kind
struct KindHook {
    kind: EntityKind,
    tracker: Arc<StatusTracker>,
}

#[async_trait]
impl LifecycleHook for KindHook {
    async fn on_insert(&self, entity: &dyn EntitySnapshot) -> PersistResult<()> {
        self.tracker.insert(self.kind, entity).await
    }

    async fn on_update(&self, entity: &dyn EntitySnapshot) -> PersistResult<()> {
        self.tracker.update(self.kind, entity).await.map(|_| ())
    }
}

/// Status tracking plugin
#[derive(Clone, Debug)]
pub struct PersistPlugin {
    bootstrap: SchemaBootstrap,
    tracker: Arc<StatusTracker>,
}

impl PersistPlugin {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            bootstrap: SchemaBootstrap::new(db.clone(), tables.clone(), logger.clone()),
            tracker: Arc::new(StatusTracker::new(db, EntityTables::new(tables), logger)),
        }
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    pub fn bootstrap(&self) -> &SchemaBootstrap {
        &self.bootstrap
    }

    /// Bootstrap the schema and register insert/update hooks for every kind
    pub async fn inject_persistence<R>(&self, registry: &mut R) -> PersistResult<()>
    where
        R: EngineRegistry + ?Sized,
    {
        self.bootstrap.run().await?;
        for kind in EntityKind::ALL {
            registry.register_lifecycle(
                kind,
                Arc::new(KindHook {
                    kind,
                    tracker: Arc::clone(&self.tracker),
                }),
            );
        }
        info!("Status persistence registered");
        Ok(())
    }
}

/// [`SuspendPersist`] backed by the checkpoint store and recovery coordinator
#[derive(Clone, Debug)]
pub struct SuspendStore {
    checkpoints: CheckpointStore,
    recovery: RecoveryCoordinator,
}

impl SuspendStore {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            checkpoints: CheckpointStore::new(db.clone(), tables, logger.clone()),
            recovery: RecoveryCoordinator::new(db, tables, logger),
        }
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn recovery(&self) -> &RecoveryCoordinator {
        &self.recovery
    }
}

#[async_trait]
impl SuspendPersist for SuspendStore {
    async fn get_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord> {
        self.recovery.get_latest_record(root_uid).await
    }

    async fn list_checkpoints(&self, recover_id: &str) -> PersistResult<Vec<Checkpoint>> {
        self.recovery.list_checkpoints(recover_id).await
    }

    async fn update_record_status(&self, record: &RecoverRecord) -> PersistResult<()> {
        self.recovery.update_record_status(record).await
    }

    async fn save_checkpoint_and_record(
        &self,
        checkpoints: &[Checkpoint],
        record: &RecoverRecord,
    ) -> PersistResult<()> {
        self.checkpoints.save_checkpoint_and_record(checkpoints, record).await
    }

    async fn claim_latest_record(&self, root_uid: &str) -> PersistResult<RecoverRecord> {
        self.recovery.claim_latest_record(root_uid).await
    }
}

/// Suspend/recover plugin
#[derive(Clone, Debug)]
pub struct SuspendPlugin {
    bootstrap: SchemaBootstrap,
    store: Arc<SuspendStore>,
}

impl SuspendPlugin {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            bootstrap: SchemaBootstrap::new(db.clone(), tables.clone(), logger.clone()),
            store: Arc::new(SuspendStore::new(db, tables, logger)),
        }
    }

    pub fn store(&self) -> &Arc<SuspendStore> {
        &self.store
    }

    pub fn bootstrap(&self) -> &SchemaBootstrap {
        &self.bootstrap
    }

    /// Bootstrap the schema and register suspend persistence
    pub async fn inject_suspend<R>(&self, registry: &mut R) -> PersistResult<()>
    where
        R: EngineRegistry + ?Sized,
    {
        self.bootstrap.run().await?;
        registry.register_suspend(self.store.clone());
        info!("Suspend persistence registered");
        Ok(())
    }
}

/// Both plugins over one connection pool
#[derive(Clone, Debug)]
pub struct Persistence {
    db: Database,
    status: PersistPlugin,
    suspend: SuspendPlugin,
}

impl Persistence {
    pub fn new(db: Database, tables: &TableConfig, logger: Logger) -> Self {
        Self {
            status: PersistPlugin::new(db.clone(), tables, logger.clone()),
            suspend: SuspendPlugin::new(db.clone(), tables, logger),
            db,
        }
    }

    /// Connect to the configured database
    pub async fn open(config: &PersistConfig, logger: Logger) -> PersistResult<Self> {
        config.validate()?;
        let db = Database::from_config(&config.database).await?;
        Ok(Self::new(db, &config.tables, logger))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn status(&self) -> &PersistPlugin {
        &self.status
    }

    pub fn suspend(&self) -> &SuspendPlugin {
        &self.suspend
    }

    /// Register status tracking and suspend persistence
    pub async fn inject<R>(&self, registry: &mut R) -> PersistResult<()>
    where
        R: EngineRegistry + ?Sized,
    {
        self.status.inject_persistence(registry).await?;
        self.suspend.inject_suspend(registry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Registry {
        lifecycle: HashMap<EntityKind, Arc<dyn LifecycleHook>>,
        suspend: Option<Arc<dyn SuspendPersist>>,
    }

    impl EngineRegistry for Registry {
        fn register_lifecycle(&mut self, kind: EntityKind, hook: Arc<dyn LifecycleHook>) {
            self.lifecycle.insert(kind, hook);
        }

        fn register_suspend(&mut self, persist: Arc<dyn SuspendPersist>) {
            self.suspend = Some(persist);
        }
    }

    #[tokio::test]
    async fn test_inject_registers_everything() {
        let db = Database::in_memory().await.unwrap();
        let persistence = Persistence::new(db, &TableConfig::default(), Logger::disabled());
        let mut registry = Registry::default();

        persistence.inject(&mut registry).await.unwrap();

        assert_eq!(registry.lifecycle.len(), 3);
        assert!(registry.suspend.is_some());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_registers_nothing() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("CREATE TABLE other (x INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("CREATE INDEX flows ON other (x)")
            .execute(db.pool())
            .await
            .unwrap();

        let plugin = PersistPlugin::new(db, &TableConfig::default(), Logger::disabled());
        let mut registry = Registry::default();

        assert!(plugin.inject_persistence(&mut registry).await.is_err());
        assert!(registry.lifecycle.is_empty());
    }
}
