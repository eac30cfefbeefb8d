//! Integration tests for the remote store client against a live server.
//!
//! Starts an in-process `taskflow-server`, connects [`RemoteStore`] clients
//! over real WebSockets, and checks the submit/ack cycle and snapshot
//! propagation across connections of the same user.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskflow::checklist::WritePlan;
use taskflow::store::remote::RemoteStore;
use taskflow::store::{StoreError, StoreEvent, TaskStore};
use taskflow_proto::task::{TaskId, TaskPatch, TaskRecord};
use taskflow_server::server::start_test_server;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_record(user_id: &str, order: u32, text: &str) -> TaskRecord {
    TaskRecord {
        id: TaskId::new(),
        user_id: user_id.to_string(),
        text: text.to_string(),
        completed: false,
        locked: order != 0,
        order,
        category_id: None,
        created_at: u64::from(order),
        updated_at: u64::from(order),
    }
}

async fn connect(addr: std::net::SocketAddr, user_id: &str) -> RemoteStore {
    let url = format!("ws://{addr}/store");
    RemoteStore::connect(&url, user_id)
        .await
        .expect("connect to test server")
}

/// Waits for the next task snapshot, skipping category pushes.
async fn next_task_snapshot(store: &mut RemoteStore) -> Vec<TaskRecord> {
    loop {
        match store.next_event().await.expect("store event") {
            StoreEvent::Tasks(tasks) => return tasks,
            StoreEvent::Categories(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Connect and submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initial_snapshots_arrive_on_connect() {
    let (addr, _handle) = start_test_server().await;
    let mut store = connect(addr, "alice").await;

    let first = store.next_event().await.expect("first event");
    assert_eq!(first, StoreEvent::Tasks(Vec::new()));
    let second = store.next_event().await.expect("second event");
    assert_eq!(second, StoreEvent::Categories(Vec::new()));
}

#[tokio::test]
async fn committed_create_shows_up_in_the_next_snapshot() {
    let (addr, _handle) = start_test_server().await;
    let mut store = connect(addr, "alice").await;

    // Drain the initial snapshots.
    let _ = next_task_snapshot(&mut store).await;

    let record = make_record("alice", 0, "Check wind speed");
    store
        .submit(&WritePlan::CreateTask(record.clone()))
        .await
        .expect("submit create");

    let tasks = next_task_snapshot(&mut store).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, record.id);
    assert_eq!(tasks[0].text, "Check wind speed");
}

#[tokio::test]
async fn rejected_write_surfaces_the_server_reason() {
    let (addr, _handle) = start_test_server().await;
    let mut store = connect(addr, "alice").await;

    let err = store
        .submit(&WritePlan::UpdateTask(
            TaskId::new(),
            TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        ))
        .await
        .expect_err("update of unknown task");
    match err {
        StoreError::Rejected(reason) => assert!(reason.contains("not found"), "got: {reason}"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn batch_update_applies_atomically() {
    let (addr, _handle) = start_test_server().await;
    let mut store = connect(addr, "alice").await;
    let _ = next_task_snapshot(&mut store).await;

    let a = make_record("alice", 0, "Task 0");
    let b = make_record("alice", 1, "Task 1");
    for record in [a.clone(), b.clone()] {
        store
            .submit(&WritePlan::CreateTask(record))
            .await
            .expect("create");
        let _ = next_task_snapshot(&mut store).await;
    }

    // Swap the two orders in one write.
    store
        .submit(&WritePlan::BatchUpdate(vec![
            (
                a.id,
                TaskPatch {
                    order: Some(1),
                    ..TaskPatch::default()
                },
            ),
            (
                b.id,
                TaskPatch {
                    order: Some(0),
                    ..TaskPatch::default()
                },
            ),
        ]))
        .await
        .expect("batch update");

    let tasks = next_task_snapshot(&mut store).await;
    assert_eq!(tasks[0].id, b.id, "snapshot is sorted by order");
    assert_eq!(tasks[1].id, a.id);
}

// ---------------------------------------------------------------------------
// Multiple connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_connection_of_the_same_user_sees_writes() {
    let (addr, _handle) = start_test_server().await;
    let mut writer = connect(addr, "alice").await;
    let mut watcher = connect(addr, "alice").await;
    let _ = next_task_snapshot(&mut writer).await;
    let _ = next_task_snapshot(&mut watcher).await;

    let record = make_record("alice", 0, "Set up sail");
    writer
        .submit(&WritePlan::CreateTask(record.clone()))
        .await
        .expect("create");

    let tasks = next_task_snapshot(&mut watcher).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, record.id);
}

#[tokio::test]
async fn users_do_not_see_each_other() {
    let (addr, _handle) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;
    let _ = next_task_snapshot(&mut alice).await;

    alice
        .submit(&WritePlan::CreateTask(make_record(
            "alice",
            0,
            "Drive to beach",
        )))
        .await
        .expect("create");
    let _ = next_task_snapshot(&mut alice).await;

    // Bob connects afterwards and starts from an empty list.
    let mut bob = connect(addr, "bob").await;
    let tasks = next_task_snapshot(&mut bob).await;
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn category_writes_push_category_snapshots() {
    use taskflow_proto::category::{CategoryId, CategoryRecord};

    let (addr, _handle) = start_test_server().await;
    let mut store = connect(addr, "alice").await;
    let _ = store.next_event().await.expect("initial tasks");
    let _ = store.next_event().await.expect("initial categories");

    let record = CategoryRecord {
        id: CategoryId::new(),
        user_id: "alice".to_string(),
        name: "Gear".to_string(),
        color: "#20c997".to_string(),
        created_at: 1000,
        updated_at: 1000,
    };
    store
        .submit(&WritePlan::CreateCategory(record.clone()))
        .await
        .expect("create category");

    match store.next_event().await.expect("event") {
        StoreEvent::Categories(categories) => {
            assert_eq!(categories.len(), 1);
            assert_eq!(categories[0].id, record.id);
        }
        other => panic!("expected category snapshot, got {other:?}"),
    }
}
