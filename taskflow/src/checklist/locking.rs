//! Pure ordering and lock rules for the sequential checklist.
//!
//! One rule defines every lock state: the task at position 0 is never
//! locked, and the task at position `i > 0` is locked exactly when the task
//! at `i - 1` is not completed. Everything else in this module is bookkeeping
//! around that rule. Lock state is always recomputed from scratch after a
//! mutation rather than patched incrementally, so an un-completion in the
//! middle of the list relocks its successor in the same pass regardless of
//! that successor's own completion state.

use taskflow_proto::task::TaskRecord;

/// Recomputes every `locked` flag from completion state and position.
///
/// `tasks` must already be in sequence order.
pub fn recompute_locks(tasks: &mut [TaskRecord]) {
    let mut prev_completed = true;
    for task in tasks.iter_mut() {
        task.locked = !prev_completed;
        prev_completed = task.completed;
    }
}

/// Lock state for a task appended at the end of `tasks`.
///
/// Unlocked only when the list is empty or its current last task is
/// completed.
#[must_use]
pub fn lock_for_append(tasks: &[TaskRecord]) -> bool {
    tasks.last().is_some_and(|last| !last.completed)
}

/// Whether moving the task at `from` to position `to` is permitted.
///
/// The moved task must be neither locked nor completed, and its predecessor
/// in the post-move arrangement must be completed (or the target must be the
/// head of the list). Out-of-range positions and same-position moves are
/// never permitted.
#[must_use]
pub fn move_allowed(tasks: &[TaskRecord], from: usize, to: usize) -> bool {
    if from >= tasks.len() || to >= tasks.len() || from == to {
        return false;
    }
    let source = &tasks[from];
    if source.locked || source.completed {
        return false;
    }
    if to == 0 {
        return true;
    }
    // Post-move predecessor: moving toward the head shifts [to, from) right,
    // so the record at to-1 stays put; moving toward the tail shifts
    // (from, to] left, so the record now at `to` ends up at to-1.
    let predecessor = if to < from { &tasks[to - 1] } else { &tasks[to] };
    predecessor.completed
}

/// Moves the task at `from` to position `to` if permitted, reassigning
/// contiguous `order` values and recomputing locks.
///
/// Returns `false` without touching the list when the move is not allowed.
pub fn apply_move(tasks: &mut Vec<TaskRecord>, from: usize, to: usize) -> bool {
    if !move_allowed(tasks, from, to) {
        return false;
    }
    let task = tasks.remove(from);
    tasks.insert(to, task);
    renumber(tasks);
    recompute_locks(tasks);
    true
}

/// Reassigns contiguous 0-based `order` values matching list position.
pub fn renumber(tasks: &mut [TaskRecord]) {
    for (index, task) in tasks.iter_mut().enumerate() {
        task.order = u32::try_from(index).unwrap_or(u32::MAX);
    }
}

/// Sorts records into sequence order: by `order`, ties broken by
/// `created_at`, then by id.
pub fn sort_into_sequence(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Checks that every `locked` flag matches the sequential rule.
#[must_use]
pub fn locks_consistent(tasks: &[TaskRecord]) -> bool {
    let mut prev_completed = true;
    for task in tasks {
        if task.locked != !prev_completed {
            return false;
        }
        prev_completed = task.completed;
    }
    true
}
