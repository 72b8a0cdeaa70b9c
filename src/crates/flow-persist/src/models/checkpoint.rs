//! Checkpoint model for suspend/recover persistence

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Depth of the execution unit a checkpoint describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointScope {
    Root = 0,
    Process = 1,
    Step = 2,
}

impl CheckpointScope {
    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(CheckpointScope::Root),
            1 => Some(CheckpointScope::Process),
            2 => Some(CheckpointScope::Step),
            _ => None,
        }
    }
}

/// Immutable snapshot of one logical execution unit, taken at a suspend point
///
/// All checkpoints written for one suspend event share a `recover_id`. The
/// `snapshot` payload is produced by the engine and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Checkpoint {
    /// Unique checkpoint identifier
    pub id: String,

    /// Logical unit the snapshot belongs to
    pub uid: String,

    pub name: String,

    /// Suspend event this checkpoint belongs to
    pub recover_id: String,

    pub parent_uid: String,

    pub root_uid: String,

    /// Raw scope code, see [`CheckpointScope`]
    pub scope: i64,

    /// Opaque engine payload
    pub snapshot: Vec<u8>,

    /// Creation timestamp (RFC 3339 string)
    pub created_at: String,

    pub updated_at: String,
}

impl Checkpoint {
    /// Create a new checkpoint stamped with the current time
    pub fn new(
        id: impl Into<String>,
        uid: impl Into<String>,
        name: impl Into<String>,
        recover_id: impl Into<String>,
        scope: CheckpointScope,
        snapshot: Vec<u8>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            uid: uid.into(),
            name: name.into(),
            recover_id: recover_id.into(),
            parent_uid: String::new(),
            root_uid: String::new(),
            scope: scope.as_i64(),
            snapshot,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Builder method to set the parent and root units
    pub fn with_lineage(mut self, parent_uid: impl Into<String>, root_uid: impl Into<String>) -> Self {
        self.parent_uid = parent_uid.into();
        self.root_uid = root_uid.into();
        self
    }

    pub fn checkpoint_scope(&self) -> Option<CheckpointScope> {
        CheckpointScope::from_i64(self.scope)
    }
}
