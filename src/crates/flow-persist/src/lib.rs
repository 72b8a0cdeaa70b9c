//! # flow-persist - Durable status and suspend/recover for workflow engines
//!
//! A persistence adapter for a workflow engine that runs a three-level
//! hierarchy of flows, processes and steps. It provides:
//!
//! - **Status tracking** - one row per entity, inserted as `Begin` and patched
//!   to `Suspend`, `Success` or `Failure`; terminal rows never change again
//! - **Atomic suspend points** - every checkpoint of a suspend event and its
//!   recovery record commit together or not at all
//! - **Single-consumer recovery** - the idle record of a root is consumed with
//!   a conditional write, so a suspend point is never replayed twice
//!
//! Snapshots are opaque bytes produced by the engine and stored verbatim.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flow_persist::{Logger, PersistConfig, Persistence};
//! # use flow_persist::engine::{EngineRegistry, LifecycleHook, SuspendPersist};
//! # use flow_persist::models::EntityKind;
//! # use std::sync::Arc;
//! # struct Engine;
//! # impl EngineRegistry for Engine {
//! #     fn register_lifecycle(&mut self, _: EntityKind, _: Arc<dyn LifecycleHook>) {}
//! #     fn register_suspend(&mut self, _: Arc<dyn SuspendPersist>) {}
//! # }
//!
//! # async fn example() -> flow_persist::PersistResult<()> {
//! let config = PersistConfig::default();
//! let logger = Logger::from_config(&config.logging)?;
//! let persistence = Persistence::open(&config, logger).await?;
//!
//! let mut engine = Engine;
//! persistence.inject(&mut engine).await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod plugin;
pub mod repositories;
pub mod tables;

pub use bootstrap::SchemaBootstrap;
pub use config::{load_config, ConfigLoader, PersistConfig, TableConfig};
pub use db::{Database, DatabasePool};
pub use engine::{EngineRegistry, EntitySnapshot, LifecycleHook, SuspendPersist};
pub use error::{PersistError, PersistResult, TransactionStage};
pub use logging::Logger;
pub use models::{
    new_id, Checkpoint, CheckpointScope, EntityKind, EntityStatus, ExecutionRecord,
    RecoverRecord, RecoverStatus,
};
pub use plugin::{PersistPlugin, Persistence, SuspendPlugin, SuspendStore};
pub use repositories::{CheckpointStore, RecoveryCoordinator, StatusTracker};
pub use tables::{EntityTable, EntityTables};
