//! Status tracking through the engine lifecycle hooks

mod common;

use chrono::{Duration, Utc};
use common::{setup, FakeEntity};
use flow_persist::{EntityKind, EntityStatus, PersistError};

#[tokio::test]
async fn test_flow_runs_to_success() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    let mut flow = FakeEntity::flow("F1", "order-intake");
    tracker.insert(EntityKind::Flow, &flow).await.unwrap();

    let begun = tracker.get(EntityKind::Flow, "F1").await.unwrap().unwrap();
    assert_eq!(begun.entity_status(), Some(EntityStatus::Begin));
    assert_eq!(begun.finished_at, None);

    let end = flow.start + Duration::seconds(3);
    flow.finish(true, end);
    let written = tracker.update(EntityKind::Flow, &flow).await.unwrap();
    assert_eq!(written, EntityStatus::Success);

    let done = tracker.get(EntityKind::Flow, "F1").await.unwrap().unwrap();
    assert_eq!(done.entity_status(), Some(EntityStatus::Success));
    assert_eq!(done.finished_time(), Some(end));
}

#[tokio::test]
async fn test_suspended_wins_over_success() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    let mut flow = FakeEntity::flow("F2", "approval");
    tracker.insert(EntityKind::Flow, &flow).await.unwrap();

    flow.success = true;
    flow.suspended = true;
    tracker.update(EntityKind::Flow, &flow).await.unwrap();

    let row = tracker.get(EntityKind::Flow, "F2").await.unwrap().unwrap();
    assert_eq!(row.entity_status(), Some(EntityStatus::Suspend));
    assert_eq!(row.finished_at, None);
}

#[tokio::test]
async fn test_suspended_flow_resumes_to_failure() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    let mut flow = FakeEntity::flow("F3", "payout");
    tracker.insert(EntityKind::Flow, &flow).await.unwrap();

    flow.suspended = true;
    tracker.update(EntityKind::Flow, &flow).await.unwrap();

    flow.suspended = false;
    flow.finish(false, Utc::now());
    tracker.update(EntityKind::Flow, &flow).await.unwrap();

    let row = tracker.get(EntityKind::Flow, "F3").await.unwrap().unwrap();
    assert_eq!(row.entity_status(), Some(EntityStatus::Failure));
    assert!(row.finished_at.is_some());
}

#[tokio::test]
async fn test_name_and_created_time_never_change() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    let mut flow = FakeEntity::flow("F4", "original-name");
    tracker.insert(EntityKind::Flow, &flow).await.unwrap();
    let before = tracker.get(EntityKind::Flow, "F4").await.unwrap().unwrap();

    flow.name = "renamed".to_string();
    flow.start = flow.start + Duration::hours(1);
    flow.suspended = true;
    tracker.update(EntityKind::Flow, &flow).await.unwrap();
    flow.suspended = false;
    flow.finish(true, Utc::now());
    tracker.update(EntityKind::Flow, &flow).await.unwrap();

    let after = tracker.get(EntityKind::Flow, "F4").await.unwrap().unwrap();
    assert_eq!(after.name, "original-name");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_time() >= before.updated_time());
}

#[tokio::test]
async fn test_finished_entity_rejects_updates() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    let mut flow = FakeEntity::flow("F5", "settled");
    tracker.insert(EntityKind::Flow, &flow).await.unwrap();
    flow.finish(true, Utc::now());
    tracker.update(EntityKind::Flow, &flow).await.unwrap();

    flow.success = false;
    let err = tracker.update(EntityKind::Flow, &flow).await.unwrap_err();
    assert!(matches!(err, PersistError::InvalidTransition { .. }));

    let row = tracker.get(EntityKind::Flow, "F5").await.unwrap().unwrap();
    assert_eq!(row.entity_status(), Some(EntityStatus::Success));
}

#[tokio::test]
async fn test_update_of_unknown_entity_is_not_found() {
    let persistence = setup().await;
    let flow = FakeEntity::flow("ghost", "never-inserted");

    let err = persistence
        .status()
        .tracker()
        .update(EntityKind::Flow, &flow)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_duplicate_insert_is_write_conflict() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();
    let step = FakeEntity::step("S1", "fetch", "F1", "P1");

    tracker.insert(EntityKind::Step, &step).await.unwrap();
    let err = tracker.insert(EntityKind::Step, &step).await.unwrap_err();
    assert!(err.is_write_conflict());
}

#[tokio::test]
async fn test_hierarchy_keeps_parent_ids() {
    let persistence = setup().await;
    let tracker = persistence.status().tracker();

    tracker
        .insert(EntityKind::Flow, &FakeEntity::flow("F1", "root"))
        .await
        .unwrap();
    for id in ["P1", "P2"] {
        tracker
            .insert(EntityKind::Process, &FakeEntity::process(id, "branch", "F1"))
            .await
            .unwrap();
    }
    tracker
        .insert(EntityKind::Step, &FakeEntity::step("S1", "leaf", "F1", "P2"))
        .await
        .unwrap();

    let processes = tracker.list_children(EntityKind::Process, "F1").await.unwrap();
    let mut ids: Vec<_> = processes.iter().map(|p| p.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["P1", "P2"]);

    let steps = tracker.list_children(EntityKind::Step, "P2").await.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].flow_id.as_deref(), Some("F1"));
    assert_eq!(steps[0].process_id.as_deref(), Some("P2"));

    let flow = tracker.get(EntityKind::Flow, "F1").await.unwrap().unwrap();
    assert_eq!(flow.flow_id, None);
    assert_eq!(flow.process_id, None);
}

#[tokio::test]
async fn test_flows_have_no_parent_listing() {
    let persistence = setup().await;
    let err = persistence
        .status()
        .tracker()
        .list_children(EntityKind::Flow, "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InvalidInput(_)));
}
