//! Integration tests for reorder rules.
//!
//! A task may move only while it is neither locked nor completed, and only
//! to positions where its new predecessor is completed (or to the front of
//! the list). Violations are silent no-ops: nothing changes and nothing is
//! queued for persistence.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskflow::checklist::{ChecklistError, ChecklistManager, MoveOutcome, WritePlan};
use taskflow_proto::task::TaskId;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Creates a manager with `n` tasks, the first `completed` of them done.
fn make_checklist(n: usize, completed: usize) -> ChecklistManager {
    let mut manager = ChecklistManager::new("user-1");
    for i in 0..n {
        let (_, command) = manager
            .add_task(&format!("Task {i}"), None)
            .expect("add task");
        manager.confirm(command);
    }
    for i in 0..completed {
        let id = manager.tasks()[i].id;
        let command = manager.toggle_task(id).expect("toggle");
        manager.confirm(command);
    }
    manager
}

fn texts(manager: &ChecklistManager) -> Vec<&str> {
    manager.tasks().iter().map(|t| t.text.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Permitted moves
// ---------------------------------------------------------------------------

#[test]
fn unlocked_task_moves_to_front() {
    // Task 0 complete, so Task 1 is unlocked and may take position 0.
    let mut manager = make_checklist(3, 1);
    let id = manager.tasks()[1].id;

    let outcome = manager.move_task(id, 0).expect("move");
    assert!(matches!(outcome, MoveOutcome::Moved(_)));
    assert_eq!(texts(&manager), vec!["Task 1", "Task 0", "Task 2"]);
}

#[test]
fn move_behind_completed_predecessor_is_permitted() {
    // Tasks 0 and 1 complete; Task 2 unlocked. Move Task 2 to position 1,
    // where its predecessor (Task 0) is completed.
    let mut manager = make_checklist(4, 2);
    let id = manager.tasks()[2].id;

    let outcome = manager.move_task(id, 1).expect("move");
    assert!(matches!(outcome, MoveOutcome::Moved(_)));
    assert_eq!(texts(&manager), vec!["Task 0", "Task 2", "Task 1", "Task 3"]);
}

#[test]
fn move_renumbers_orders_and_recomputes_locks() {
    let mut manager = make_checklist(3, 1);
    let id = manager.tasks()[1].id;
    manager.move_task(id, 0).expect("move");

    let orders: Vec<u32> = manager.tasks().iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    // New head is incomplete, so everything behind it locks.
    let locked: Vec<bool> = manager.tasks().iter().map(|t| t.locked).collect();
    assert_eq!(locked, vec![false, true, true]);
}

#[test]
fn move_plan_rewrites_the_whole_sequence() {
    let mut manager = make_checklist(3, 1);
    let id = manager.tasks()[1].id;

    let MoveOutcome::Moved(command) = manager.move_task(id, 0).expect("move") else {
        panic!("move should be permitted");
    };
    match manager.write_plan(command).expect("plan") {
        WritePlan::BatchUpdate(patches) => {
            assert_eq!(patches.len(), 3, "every order is rewritten atomically");
            assert!(patches.iter().all(|(_, p)| p.order.is_some()));
        }
        other => panic!("expected BatchUpdate, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Rejected moves
// ---------------------------------------------------------------------------

#[test]
fn locked_task_does_not_move() {
    let mut manager = make_checklist(3, 0);
    let id = manager.tasks()[2].id;
    let before = manager.tasks().to_vec();

    let outcome = manager.move_task(id, 0).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
    assert_eq!(manager.tasks(), &before[..]);
}

#[test]
fn completed_task_does_not_move() {
    let mut manager = make_checklist(3, 2);
    let id = manager.tasks()[0].id;
    assert!(manager.tasks()[0].completed);
    let before = manager.tasks().to_vec();

    let outcome = manager.move_task(id, 2).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
    assert_eq!(manager.tasks(), &before[..]);
}

#[test]
fn move_behind_incomplete_predecessor_is_rejected() {
    // Only Task 0 is complete; Task 1 is unlocked but may not move to
    // position 2, where its predecessor (Task 2) is incomplete.
    let mut manager = make_checklist(4, 1);
    let id = manager.tasks()[1].id;

    let outcome = manager.move_task(id, 2).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
}

#[test]
fn same_position_move_is_rejected() {
    let mut manager = make_checklist(3, 1);
    let id = manager.tasks()[1].id;
    let outcome = manager.move_task(id, 1).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
}

#[test]
fn out_of_range_target_is_rejected() {
    let mut manager = make_checklist(3, 1);
    let id = manager.tasks()[1].id;
    let outcome = manager.move_task(id, 3).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
}

#[test]
fn unknown_task_is_an_error_not_a_rejection() {
    let mut manager = make_checklist(2, 0);
    let ghost = TaskId::new();
    let err = manager.move_task(ghost, 0).expect_err("unknown task");
    assert_eq!(err, ChecklistError::TaskNotFound(ghost));
}

#[test]
fn rejected_move_queues_no_write() {
    let mut manager = make_checklist(3, 0);
    let pending_before = manager.pending_len();
    let id = manager.tasks()[2].id;

    let outcome = manager.move_task(id, 0).expect("move call");
    assert_eq!(outcome, MoveOutcome::Rejected);
    assert_eq!(manager.pending_len(), pending_before);
}
