//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use flow_persist::{Database, EntitySnapshot, Logger, Persistence, TableConfig};
use tempfile::TempDir;

/// Engine-side view of a flow, process or step
#[derive(Debug, Clone)]
pub struct FakeEntity {
    pub id: String,
    pub name: String,
    pub flow_id: Option<String>,
    pub process_id: Option<String>,
    pub success: bool,
    pub suspended: bool,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl FakeEntity {
    pub fn flow(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            flow_id: None,
            process_id: None,
            success: false,
            suspended: false,
            start: Utc::now(),
            end: None,
        }
    }

    pub fn process(id: &str, name: &str, flow_id: &str) -> Self {
        Self {
            flow_id: Some(flow_id.to_string()),
            ..Self::flow(id, name)
        }
    }

    pub fn step(id: &str, name: &str, flow_id: &str, process_id: &str) -> Self {
        Self {
            process_id: Some(process_id.to_string()),
            ..Self::process(id, name, flow_id)
        }
    }

    pub fn finish(&mut self, success: bool, end: DateTime<Utc>) {
        self.success = success;
        self.end = Some(end);
    }
}

impl EntitySnapshot for FakeEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    fn process_id(&self) -> Option<&str> {
        self.process_id.as_deref()
    }

    fn success(&self) -> bool {
        self.success
    }

    fn suspended(&self) -> bool {
        self.suspended
    }

    fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end
    }
}

/// In-memory persistence with the schema in place
pub async fn setup() -> Persistence {
    let db = Database::in_memory().await.unwrap();
    let persistence = Persistence::new(db, &TableConfig::default(), Logger::disabled());
    persistence.status().bootstrap().run().await.unwrap();
    persistence
}

/// File-backed database allowing concurrent connections
pub async fn file_database(dir: &TempDir, max_connections: u32) -> Database {
    let path = dir.path().join("flow-persist.db");
    let url = format!("sqlite:{}?mode=rwc", path.display());
    Database::with_max_connections(&url, max_connections)
        .await
        .unwrap()
}
