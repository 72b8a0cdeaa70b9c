//! Execution status records for flows, processes and steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// The three levels of the engine's execution hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Flow,
    Process,
    Step,
}

impl EntityKind {
    /// All kinds, parents first
    pub const ALL: [EntityKind; 3] = [EntityKind::Flow, EntityKind::Process, EntityKind::Step];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Flow => "flow",
            EntityKind::Process => "process",
            EntityKind::Step => "step",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle status of an execution entity
///
/// Stored as a small integer: 0=Begin, 1=Suspend, 2=Success, 3=Failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    Begin = 0,
    Suspend = 1,
    Success = 2,
    Failure = 3,
}

impl EntityStatus {
    /// Status reported on an update callback.
    ///
    /// A suspended entity is always `Suspend`, whatever its success flag says.
    pub fn derive(success: bool, suspended: bool) -> Self {
        if suspended {
            EntityStatus::Suspend
        } else if success {
            EntityStatus::Success
        } else {
            EntityStatus::Failure
        }
    }

    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(EntityStatus::Begin),
            1 => Some(EntityStatus::Suspend),
            2 => Some(EntityStatus::Success),
            3 => Some(EntityStatus::Failure),
            _ => None,
        }
    }

    /// Success and Failure never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntityStatus::Success | EntityStatus::Failure)
    }

    /// Statuses an update is allowed to overwrite
    pub(crate) const UPDATABLE: [EntityStatus; 2] = [EntityStatus::Begin, EntityStatus::Suspend];
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityStatus::Begin => write!(f, "Begin"),
            EntityStatus::Suspend => write!(f, "Suspend"),
            EntityStatus::Success => write!(f, "Success"),
            EntityStatus::Failure => write!(f, "Failure"),
        }
    }
}

/// One row of the flow, process or step status tables
///
/// Columns a kind does not have (a flow's parents, a process's `process_id`)
/// are read back as `None`.
///
/// # Timestamps
/// All timestamp fields are RFC 3339 strings, stored as TEXT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExecutionRecord {
    pub id: String,
    pub name: String,
    /// Raw status code, see [`EntityStatus`]
    pub status: i64,
    pub flow_id: Option<String>,
    pub process_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
}

impl ExecutionRecord {
    /// Decoded status, `None` for codes outside the known range
    pub fn entity_status(&self) -> Option<EntityStatus> {
        EntityStatus::from_i64(self.status)
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    pub fn updated_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    pub fn finished_time(&self) -> Option<DateTime<Utc>> {
        self.finished_at.as_deref().and_then(parse_timestamp)
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspend_wins_over_success() {
        assert_eq!(EntityStatus::derive(true, true), EntityStatus::Suspend);
        assert_eq!(EntityStatus::derive(false, true), EntityStatus::Suspend);
    }

    #[test]
    fn test_success_and_failure() {
        assert_eq!(EntityStatus::derive(true, false), EntityStatus::Success);
        assert_eq!(EntityStatus::derive(false, false), EntityStatus::Failure);
    }

    #[test]
    fn test_status_codes() {
        for status in [
            EntityStatus::Begin,
            EntityStatus::Suspend,
            EntityStatus::Success,
            EntityStatus::Failure,
        ] {
            assert_eq!(EntityStatus::from_i64(status.as_i64()), Some(status));
        }
        assert_eq!(EntityStatus::Suspend.as_i64(), 1);
        assert_eq!(EntityStatus::from_i64(9), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!EntityStatus::Begin.is_terminal());
        assert!(!EntityStatus::Suspend.is_terminal());
        assert!(EntityStatus::Success.is_terminal());
        assert!(EntityStatus::Failure.is_terminal());
    }

    #[test]
    fn test_record_time_accessors() {
        let record = ExecutionRecord {
            id: "f-1".to_string(),
            name: "flow".to_string(),
            status: 2,
            flow_id: None,
            process_id: None,
            created_at: "2024-05-01T10:00:00+00:00".to_string(),
            updated_at: "2024-05-01T10:00:05+00:00".to_string(),
            finished_at: None,
        };

        assert_eq!(record.entity_status(), Some(EntityStatus::Success));
        assert!(record.created_time().is_some());
        assert!(record.finished_time().is_none());
    }

    mod properties {
        use super::super::EntityStatus;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn suspended_always_derives_suspend(success in any::<bool>()) {
                prop_assert_eq!(EntityStatus::derive(success, true), EntityStatus::Suspend);
            }

            #[test]
            fn derived_status_is_never_begin(success in any::<bool>(), suspended in any::<bool>()) {
                prop_assert_ne!(EntityStatus::derive(success, suspended), EntityStatus::Begin);
            }
        }
    }
}
