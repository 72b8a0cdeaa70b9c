//! Entity kind to table/column mapping
//!
//! Flows, processes and steps share one record shape but live in separate
//! tables with different parent columns. [`EntityTables`] spells that out so a
//! single status tracker can serve all three kinds.

use crate::config::TableConfig;
use crate::models::EntityKind;

/// Parent an entity row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Flow,
    Process,
}

impl ParentRef {
    /// Field name on [`crate::models::ExecutionRecord`]
    pub fn field(&self) -> &'static str {
        match self {
            ParentRef::Flow => "flow_id",
            ParentRef::Process => "process_id",
        }
    }
}

/// A parent reference column in a status table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentColumn {
    pub parent: ParentRef,
    pub column: &'static str,
}

/// Table and parent columns for one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable {
    pub kind: EntityKind,
    pub table: String,
    pub parents: Vec<ParentColumn>,
}

impl EntityTable {
    /// Column holding the given parent id, if this kind has one
    pub fn parent_column(&self, parent: ParentRef) -> Option<&'static str> {
        self.parents
            .iter()
            .find(|p| p.parent == parent)
            .map(|p| p.column)
    }

    /// Select list producing an [`crate::models::ExecutionRecord`] row
    pub(crate) fn select_list(&self) -> String {
        let parent = |p: ParentRef| match self.parent_column(p) {
            Some(column) => format!("{} AS {}", column, p.field()),
            None => format!("NULL AS {}", p.field()),
        };
        format!(
            "id, name, status, {}, {}, created_at, updated_at, finished_at",
            parent(ParentRef::Flow),
            parent(ParentRef::Process)
        )
    }
}

/// Mapping for all three kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTables {
    flow: EntityTable,
    process: EntityTable,
    step: EntityTable,
}

impl EntityTables {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            flow: EntityTable {
                kind: EntityKind::Flow,
                table: config.flow.clone(),
                parents: Vec::new(),
            },
            process: EntityTable {
                kind: EntityKind::Process,
                table: config.process.clone(),
                parents: vec![ParentColumn {
                    parent: ParentRef::Flow,
                    column: "flow_id",
                }],
            },
            step: EntityTable {
                kind: EntityKind::Step,
                table: config.step.clone(),
                parents: vec![
                    ParentColumn {
                        parent: ParentRef::Process,
                        column: "proc_id",
                    },
                    ParentColumn {
                        parent: ParentRef::Flow,
                        column: "flow_id",
                    },
                ],
            },
        }
    }

    pub fn get(&self, kind: EntityKind) -> &EntityTable {
        match kind {
            EntityKind::Flow => &self.flow,
            EntityKind::Process => &self.process,
            EntityKind::Step => &self.step,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityTable> {
        [&self.flow, &self.process, &self.step].into_iter()
    }
}

impl Default for EntityTables {
    fn default() -> Self {
        Self::new(&TableConfig::default())
    }
}

/// Immediate parent of a kind in the hierarchy
pub fn parent_of(kind: EntityKind) -> Option<ParentRef> {
    match kind {
        EntityKind::Flow => None,
        EntityKind::Process => Some(ParentRef::Flow),
        EntityKind::Step => Some(ParentRef::Process),
    }
}
