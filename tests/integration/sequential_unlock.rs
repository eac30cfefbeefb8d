//! Integration tests for sequential unlocking.
//!
//! A checklist is a strict sequence: only the first task starts unlocked,
//! and each task unlocks exactly when its predecessor is completed. These
//! tests drive the manager through completion, un-completion, deletion, and
//! reset and check the lock cascade after every step.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskflow::checklist::{ChecklistError, ChecklistManager};
use taskflow_proto::task::{TaskId, TaskRecord};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Creates a manager pre-filled with `n` incomplete tasks, all confirmed.
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

fn locked_flags(manager: &ChecklistManager) -> Vec<bool> {
    manager.tasks().iter().map(|t| t.locked).collect()
}

fn completed_flags(manager: &ChecklistManager) -> Vec<bool> {
    manager.tasks().iter().map(|t| t.completed).collect()
}

// ---------------------------------------------------------------------------
// Unlock cascade
// ---------------------------------------------------------------------------

#[test]
fn only_head_starts_unlocked() {
    let manager = make_checklist(4);
    assert_eq!(locked_flags(&manager), vec![false, true, true, true]);
}

#[test]
fn completing_head_unlocks_second() {
    let mut manager = make_checklist(3);
    let head = manager.tasks()[0].id;
    manager.toggle_task(head).expect("toggle head");
    assert_eq!(locked_flags(&manager), vec![false, false, true]);
}

#[test]
fn completing_in_order_walks_the_unlock_down() {
    let mut manager = make_checklist(3);
    for i in 0..3 {
        let id = manager.tasks()[i].id;
        manager.toggle_task(id).expect("toggle in order");
    }
    assert_eq!(completed_flags(&manager), vec![true, true, true]);
    assert_eq!(locked_flags(&manager), vec![false, false, false]);
}

#[test]
fn uncompleting_relocks_successor_but_keeps_its_completion() {
    let mut manager = make_checklist(3);
    let first = manager.tasks()[0].id;
    let second = manager.tasks()[1].id;
    manager.toggle_task(first).expect("complete first");
    manager.toggle_task(second).expect("complete second");

    // Un-complete the first task: the second locks again but stays done,
    // and the third stays unlocked because its own predecessor is still
    // completed.
    manager.toggle_task(first).expect("uncomplete first");
    assert_eq!(completed_flags(&manager), vec![false, true, false]);
    assert_eq!(locked_flags(&manager), vec![false, true, false]);
}

#[test]
fn toggling_a_locked_task_is_refused() {
    let mut manager = make_checklist(2);
    let second = manager.tasks()[1].id;
    let before = manager.tasks().to_vec();

    let err = manager.toggle_task(second).expect_err("locked toggle");
    assert_eq!(err, ChecklistError::TaskLocked(second));
    assert_eq!(manager.tasks(), &before[..], "state must be unchanged");
}

#[test]
fn toggling_unknown_task_is_refused() {
    let mut manager = make_checklist(1);
    let ghost = TaskId::new();
    let err = manager.toggle_task(ghost).expect_err("unknown toggle");
    assert_eq!(err, ChecklistError::TaskNotFound(ghost));
}

// ---------------------------------------------------------------------------
// Append, delete, reset
// ---------------------------------------------------------------------------

#[test]
fn appended_task_locks_behind_incomplete_tail() {
    let mut manager = make_checklist(2);
    manager.add_task("Task 2", None).expect("append");
    assert_eq!(locked_flags(&manager), vec![false, true, true]);
}

#[test]
fn appended_task_is_unlocked_after_a_fully_complete_list() {
    let mut manager = make_checklist(2);
    for i in 0..2 {
        let id = manager.tasks()[i].id;
        manager.toggle_task(id).expect("complete");
    }
    manager.add_task("Task 2", None).expect("append");
    assert_eq!(locked_flags(&manager), vec![false, false, false]);
}

#[test]
fn deleting_the_head_unlocks_the_new_head() {
    let mut manager = make_checklist(3);
    let head = manager.tasks()[0].id;
    manager.delete_task(head).expect("delete head");

    assert_eq!(manager.tasks().len(), 2);
    assert_eq!(locked_flags(&manager), vec![false, true]);
    let orders: Vec<u32> = manager.tasks().iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1], "orders renumber after delete");
}

#[test]
fn deleting_a_locked_task_is_permitted() {
    let mut manager = make_checklist(3);
    let last = manager.tasks()[2].id;
    assert!(manager.tasks()[2].locked);
    manager.delete_task(last).expect("delete locked");
    assert_eq!(manager.tasks().len(), 2);
}

#[test]
fn reset_clears_completion_and_relocks_all_but_head() {
    let mut manager = make_checklist(3);
    for i in 0..3 {
        let id = manager.tasks()[i].id;
        manager.toggle_task(id).expect("complete");
    }

    manager.reset_all().expect("reset queues a write");
    assert_eq!(completed_flags(&manager), vec![false, false, false]);
    assert_eq!(locked_flags(&manager), vec![false, true, true]);
}

#[test]
fn reset_of_empty_list_is_a_no_op() {
    let mut manager = ChecklistManager::new("user-1");
    assert!(manager.reset_all().is_none());
    assert_eq!(manager.pending_len(), 0);
}

// ---------------------------------------------------------------------------
// Snapshots and seeding
// ---------------------------------------------------------------------------

#[test]
fn snapshot_locks_are_recomputed_not_trusted() {
    let mut manager = ChecklistManager::new("user-1");
    let records: Vec<TaskRecord> = (0..3)
        .map(|i| TaskRecord {
            id: TaskId::new(),
            user_id: "user-1".to_string(),
            text: format!("Task {i}"),
            completed: i == 0,
            // Deliberately wrong stored flags.
            locked: true,
            order: i,
            category_id: None,
            created_at: u64::from(i),
            updated_at: u64::from(i),
        })
        .collect();

    assert!(manager.apply_task_snapshot(records));
    assert_eq!(locked_flags(&manager), vec![false, false, true]);
}

#[test]
fn snapshot_orders_with_gaps_still_sequence() {
    let mut manager = ChecklistManager::new("user-1");
    let mut records = Vec::new();
    for (i, order) in [(0u32, 7u32), (1, 2), (2, 11)] {
        records.push(TaskRecord {
            id: TaskId::new(),
            user_id: "user-1".to_string(),
            text: format!("Task {i}"),
            completed: false,
            locked: false,
            order,
            category_id: None,
            created_at: u64::from(i),
            updated_at: u64::from(i),
        });
    }

    assert!(manager.apply_task_snapshot(records));
    let texts: Vec<&str> = manager.tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Task 1", "Task 0", "Task 2"]);
    assert_eq!(locked_flags(&manager), vec![false, true, true]);
    let orders: Vec<u32> = manager.tasks().iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1, 2], "gapped stored orders renumber on read");
}

#[test]
fn seeded_defaults_form_a_locked_sequence() {
    let mut manager = ChecklistManager::new("user-1");
    let ids = manager.seed_defaults();
    assert_eq!(ids.len(), 6);
    assert_eq!(manager.tasks().len(), 6);
    assert_eq!(manager.tasks()[0].text, "Check wind speed");
    assert!(!manager.tasks()[0].locked);
    assert!(manager.tasks()[1..].iter().all(|t| t.locked));

    // Seeding a non-empty list does nothing.
    assert!(manager.seed_defaults().is_empty());
    assert_eq!(manager.tasks().len(), 6);
}

#[test]
fn progress_tracks_completed_share() {
    let mut manager = make_checklist(3);
    assert_eq!(manager.progress_percent(), 0);
    let head = manager.tasks()[0].id;
    manager.toggle_task(head).expect("complete head");
    assert_eq!(manager.progress_percent(), 33);
    let second = manager.tasks()[1].id;
    manager.toggle_task(second).expect("complete second");
    assert_eq!(manager.progress_percent(), 67);
}
