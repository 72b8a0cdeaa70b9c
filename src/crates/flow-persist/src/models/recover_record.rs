//! Recovery record model
//!
//! One record is written per suspend event, in the same transaction as its
//! checkpoints. It starts `Idle` and is flipped to `Consumed` exactly once.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Recovery record status: 0=Idle, 1=Consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoverStatus {
    Idle = 0,
    Consumed = 1,
}

impl RecoverStatus {
    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(RecoverStatus::Idle),
            1 => Some(RecoverStatus::Consumed),
            _ => None,
        }
    }
}

impl fmt::Display for RecoverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverStatus::Idle => write!(f, "Idle"),
            RecoverStatus::Consumed => write!(f, "Consumed"),
        }
    }
}

/// Recovery point for a root execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecoverRecord {
    pub root_uid: String,

    /// Primary key, shared with the checkpoints of the same suspend event
    pub recover_id: String,

    /// Raw status code, see [`RecoverStatus`]
    pub status: i64,

    pub name: String,

    pub created_at: String,

    pub updated_at: String,
}

impl RecoverRecord {
    /// Create a new idle record stamped with the current time
    pub fn new(root_uid: impl Into<String>, recover_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            root_uid: root_uid.into(),
            recover_id: recover_id.into(),
            status: RecoverStatus::Idle.as_i64(),
            name: name.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn recover_status(&self) -> Option<RecoverStatus> {
        RecoverStatus::from_i64(self.status)
    }

    pub fn is_idle(&self) -> bool {
        self.recover_status() == Some(RecoverStatus::Idle)
    }

    /// Builder method to set the status
    pub fn with_status(mut self, status: RecoverStatus) -> Self {
        self.status = status.as_i64();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_idle() {
        let record = RecoverRecord::new("flow-1", "r-1", "checkout");
        assert!(record.is_idle());
        assert_eq!(record.recover_status(), Some(RecoverStatus::Idle));
    }

    #[test]
    fn test_with_status() {
        let record = RecoverRecord::new("flow-1", "r-1", "checkout").with_status(RecoverStatus::Consumed);
        assert!(!record.is_idle());
        assert_eq!(record.status, 1);
    }
}
