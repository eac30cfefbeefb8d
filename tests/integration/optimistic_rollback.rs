//! Integration tests for optimistic writes and rollback.
//!
//! Every mutation applies locally first and queues a write. A confirmed
//! write just leaves the queue; a failed one rolls the list back to the
//! state before that command and replays everything queued after it,
//! revalidating each replayed command against the restored state.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskflow::checklist::{ChecklistManager, WritePlan};
use taskflow::store::memory::MemoryStore;
use taskflow::sync::{JobId, SyncCommand, SyncEvent, spawn_sync};
use taskflow_proto::task::{TaskId, TaskRecord};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_checklist(n: usize) -> ChecklistManager {
    let mut manager = ChecklistManager::new("user-1");
    for i in 0..n {
        let (_, command) = manager
            .add_task(&format!("Task {i}"), None)
            .expect("add task");
        manager.confirm(command);
    }
    manager
}

fn make_record(order: u32, text: &str) -> TaskRecord {
    TaskRecord {
        id: TaskId::new(),
        user_id: "user-1".to_string(),
        text: text.to_string(),
        completed: false,
        locked: order != 0,
        order,
        category_id: None,
        created_at: u64::from(order),
        updated_at: u64::from(order),
    }
}

/// Receives the next verdict event, skipping snapshot pushes.
async fn next_verdict(evt_rx: &mut mpsc::Receiver<SyncEvent>) -> SyncEvent {
    loop {
        match evt_rx.recv().await {
            Some(SyncEvent::TasksChanged(_) | SyncEvent::CategoriesChanged(_)) => {}
            Some(event) => return event,
            None => panic!("sync event channel closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Confirm path
// ---------------------------------------------------------------------------

#[test]
fn confirm_drains_the_pending_queue() {
    let mut manager = ChecklistManager::new("user-1");
    let (_, a) = manager.add_task("Task 0", None).expect("add");
    let (_, b) = manager.add_task("Task 1", None).expect("add");
    assert_eq!(manager.pending_len(), 2);

    manager.confirm(a);
    assert_eq!(manager.pending_len(), 1);
    manager.confirm(b);
    assert_eq!(manager.pending_len(), 0);
}

#[test]
fn snapshot_is_deferred_while_writes_are_pending() {
    let mut manager = make_checklist(1);
    let head = manager.tasks()[0].id;
    let command = manager.toggle_task(head).expect("toggle");

    // A push arriving mid-write must not clobber the optimistic state.
    let stale = vec![make_record(0, "Task 0")];
    assert!(!manager.apply_task_snapshot(stale));
    assert!(manager.tasks()[0].completed, "optimistic state kept");

    // Once the queue drains, the held-back snapshot lands.
    manager.confirm(command);
    assert!(!manager.tasks()[0].completed, "deferred snapshot applied");
}

// ---------------------------------------------------------------------------
// Rollback path
// ---------------------------------------------------------------------------

#[test]
fn reject_restores_the_pre_command_state() {
    let mut manager = make_checklist(2);
    let head = manager.tasks()[0].id;
    let command = manager.toggle_task(head).expect("toggle");
    assert!(manager.tasks()[0].completed);
    assert!(!manager.tasks()[1].locked);

    let report = manager.reject(command);
    assert_eq!(report.failed, command);
    assert!(report.reapplied.is_empty());
    assert!(!manager.tasks()[0].completed);
    assert!(manager.tasks()[1].locked);
    assert_eq!(manager.pending_len(), 0);
}

#[test]
fn later_commands_replay_on_top_of_the_rollback() {
    let mut manager = make_checklist(2);
    let head = manager.tasks()[0].id;
    let failed = manager.toggle_task(head).expect("toggle");
    let (added_id, added) = manager.add_task("Task 2", None).expect("add");

    let report = manager.reject(failed);
    assert_eq!(report.reapplied.len(), 1);
    assert_eq!(report.reapplied[0].0, added);
    assert!(report.dropped.is_empty());

    // The toggle is gone, the append survived with recomputed position.
    assert!(!manager.tasks()[0].completed);
    let replayed = manager.task(added_id).expect("replayed task");
    assert_eq!(replayed.order, 2);
    assert!(replayed.locked);
}

#[test]
fn replayed_commands_that_no_longer_validate_are_dropped() {
    let mut manager = make_checklist(2);
    let head = manager.tasks()[0].id;
    let second = manager.tasks()[1].id;

    // Completing the head unlocked the second task; its toggle is only
    // valid while the head stays completed.
    let failed = manager.toggle_task(head).expect("toggle head");
    let dependent = manager.toggle_task(second).expect("toggle second");

    let report = manager.reject(failed);
    assert_eq!(report.dropped, vec![dependent]);
    assert!(report.reapplied.is_empty());

    assert!(!manager.tasks()[0].completed);
    assert!(!manager.tasks()[1].completed);
    assert!(manager.tasks()[1].locked);
    assert_eq!(manager.pending_len(), 0);
}

#[test]
fn replayed_plans_are_regenerated_for_shifted_positions() {
    let mut manager = make_checklist(3);
    let head = manager.tasks()[0].id;

    // Delete the head, then add a task. The add's create plan records
    // order 2 (three tasks minus the deleted one).
    let deleted = manager.delete_task(head).expect("delete");
    let (_, added) = manager.add_task("Task 3", None).expect("add");
    match manager.write_plan(added).expect("plan") {
        WritePlan::CreateTask(record) => assert_eq!(record.order, 2),
        other => panic!("expected CreateTask, got {other:?}"),
    }

    // Rolling back the delete restores the head; the replayed add now
    // appends at order 3.
    let report = manager.reject(deleted);
    let (_, plan) = &report.reapplied[0];
    match plan {
        WritePlan::CreateTask(record) => assert_eq!(record.order, 3),
        other => panic!("expected CreateTask, got {other:?}"),
    }
    assert_eq!(manager.tasks().len(), 4);
}

// ---------------------------------------------------------------------------
// Full pipeline against the in-process store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_write_rolls_back_and_later_writes_land() {
    let mut store = MemoryStore::new();
    store.fail_next_writes(1);
    let (cmd_tx, mut evt_rx) = spawn_sync(store);

    let mut manager = ChecklistManager::new("user-1");

    // First write fails at the store.
    let (_, first) = manager.add_task("Check wind speed", None).expect("add");
    let plan = manager.write_plan(first).expect("plan").clone();
    cmd_tx
        .send(SyncCommand::Submit {
            job: JobId::new(1),
            plan,
        })
        .await
        .expect("send");
    match next_verdict(&mut evt_rx).await {
        SyncEvent::WriteFailed { reason, .. } => assert!(reason.contains("injected")),
        other => panic!("expected failure, got {other:?}"),
    }
    let report = manager.reject(first);
    assert!(report.reapplied.is_empty());
    assert!(manager.tasks().is_empty(), "optimistic add rolled back");

    // Second write goes through and is confirmed.
    let (task_id, second) = manager.add_task("Inspect gear", None).expect("add");
    let plan = manager.write_plan(second).expect("plan").clone();
    cmd_tx
        .send(SyncCommand::Submit {
            job: JobId::new(2),
            plan,
        })
        .await
        .expect("send");
    match next_verdict(&mut evt_rx).await {
        SyncEvent::Committed { job } => assert_eq!(job, JobId::new(2)),
        other => panic!("expected commit, got {other:?}"),
    }
    manager.confirm(second);
    assert_eq!(manager.pending_len(), 0);
    assert_eq!(manager.tasks()[0].id, task_id);

    // The store's snapshot push after the commit matches local state.
    loop {
        match evt_rx.recv().await.expect("event") {
            SyncEvent::TasksChanged(tasks) if !tasks.is_empty() => {
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].id, task_id);
                assert_eq!(tasks[0].text, "Inspect gear");
                break;
            }
            SyncEvent::TasksChanged(_) | SyncEvent::CategoriesChanged(_) => {}
            other => panic!("expected snapshot, got {other:?}"),
        }
    }
}
