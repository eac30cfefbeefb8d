//! Property-based tests for the lock invariant.
//!
//! Whatever sequence of mutations, confirmations, and rollbacks a checklist
//! goes through, the derived state must hold: the first task is unlocked,
//! every later task is locked exactly when its predecessor is incomplete,
//! and `order` values stay contiguous from zero.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use taskflow::checklist::{ChecklistManager, CommandId, MoveOutcome, locking};
use taskflow_proto::task::{TaskId, TaskRecord};

// --- Operation generation ---

/// One randomized checklist operation. Indexes are taken modulo the current
/// list or queue length when applied.
#[derive(Debug, Clone)]
enum Op {
    Add,
    Toggle(usize),
    Move(usize, usize),
    Delete(usize),
    Reset,
    Confirm(usize),
    Reject(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        4 => any::<usize>().prop_map(Op::Toggle),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Move(a, b)),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::Reset),
        3 => any::<usize>().prop_map(Op::Confirm),
        2 => any::<usize>().prop_map(Op::Reject),
    ]
}

/// Applies one operation, maintaining the list of still-pending command ids.
fn apply_op(
    manager: &mut ChecklistManager,
    pending: &mut Vec<CommandId>,
    next_text: &mut u32,
    op: &Op,
) {
    match op {
        Op::Add => {
            if let Ok((_, command)) = manager.add_task(&format!("Task {next_text}"), None) {
                *next_text += 1;
                pending.push(command);
            }
        }
        Op::Toggle(i) => {
            if let Some(task) = pick_task(manager, *i)
                && let Ok(command) = manager.toggle_task(task)
            {
                pending.push(command);
            }
        }
        Op::Move(i, j) => {
            if let Some(task) = pick_task(manager, *i) {
                let to = j % manager.tasks().len().max(1);
                if let Ok(MoveOutcome::Moved(command)) = manager.move_task(task, to) {
                    pending.push(command);
                }
            }
        }
        Op::Delete(i) => {
            if let Some(task) = pick_task(manager, *i)
                && let Ok(command) = manager.delete_task(task)
            {
                pending.push(command);
            }
        }
        Op::Reset => {
            if let Some(command) = manager.reset_all() {
                pending.push(command);
            }
        }
        Op::Confirm(i) => {
            if !pending.is_empty() {
                // Confirmations arrive oldest-first in practice, but the
                // invariant must hold for any order.
                let command = pending.remove(i % pending.len());
                manager.confirm(command);
            }
        }
        Op::Reject(i) => {
            if !pending.is_empty() {
                let command = pending.remove(i % pending.len());
                let report = manager.reject(command);
                pending.retain(|c| !report.dropped.contains(c));
            }
        }
    }
}

fn pick_task(manager: &ChecklistManager, i: usize) -> Option<TaskId> {
    let tasks = manager.tasks();
    if tasks.is_empty() {
        None
    } else {
        Some(tasks[i % tasks.len()].id)
    }
}

/// The derived-state invariant every reachable state must satisfy.
fn check_invariant(tasks: &[TaskRecord]) -> Result<(), TestCaseError> {
    prop_assert!(locking::locks_consistent(tasks));
    for (i, task) in tasks.iter().enumerate() {
        prop_assert_eq!(task.order as usize, i, "orders stay contiguous");
        if i == 0 {
            prop_assert!(!task.locked, "head is never locked");
        } else {
            prop_assert_eq!(
                task.locked,
                !tasks[i - 1].completed,
                "lock mirrors predecessor completion"
            );
        }
    }
    Ok(())
}

// --- Properties ---

proptest! {
    /// Any operation sequence leaves the lock/order invariant intact, and
    /// keeps it intact at every intermediate step.
    #[test]
    fn mutations_preserve_lock_invariant(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut manager = ChecklistManager::new("user-1");
        let mut pending = Vec::new();
        let mut next_text = 0u32;
        for op in &ops {
            apply_op(&mut manager, &mut pending, &mut next_text, op);
            check_invariant(manager.tasks())?;
        }
    }

    /// Progress is always within 0..=100 and 100 only when everything is done.
    #[test]
    fn progress_is_bounded(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut manager = ChecklistManager::new("user-1");
        let mut pending = Vec::new();
        let mut next_text = 0u32;
        for op in &ops {
            apply_op(&mut manager, &mut pending, &mut next_text, op);
        }
        let percent = manager.progress_percent();
        prop_assert!(percent <= 100);
        let all_done = !manager.tasks().is_empty()
            && manager.tasks().iter().all(|t| t.completed);
        if percent == 100 {
            prop_assert!(all_done);
        }
    }

    /// A snapshot with arbitrary stored flags and order values normalizes to
    /// a consistent sequence.
    #[test]
    fn snapshots_normalize_to_the_invariant(
        seeds in prop::collection::vec((any::<u32>(), any::<bool>(), any::<bool>(), any::<u64>()), 0..20)
    ) {
        let records: Vec<TaskRecord> = seeds
            .iter()
            .enumerate()
            .map(|(i, (order, completed, locked, created_at))| TaskRecord {
                id: TaskId::new(),
                user_id: "user-1".to_string(),
                text: format!("Task {i}"),
                completed: *completed,
                locked: *locked,
                order: *order,
                category_id: None,
                created_at: *created_at,
                updated_at: *created_at,
            })
            .collect();

        let mut manager = ChecklistManager::new("user-1");
        prop_assert!(manager.apply_task_snapshot(records));
        check_invariant(manager.tasks())?;
    }
}
