//! Persisted models
//!
//! All timestamp fields are stored as RFC 3339 strings (TEXT in SQLite).

pub mod checkpoint;
pub mod execution;
pub mod recover_record;

pub use checkpoint::{Checkpoint, CheckpointScope};
pub use execution::{EntityKind, EntityStatus, ExecutionRecord};
pub use recover_record::{RecoverRecord, RecoverStatus};

/// Fresh 36-character identifier for checkpoints and recover records
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
