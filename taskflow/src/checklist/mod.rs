//! Sequential checklist state.
//!
//! The checklist is an ordered list of tasks unlocked one at a time: the
//! first task is always actionable, and every later task stays locked until
//! its predecessor is completed. [`manager::ChecklistManager`] owns the
//! in-memory list and the optimistic-write bookkeeping; [`locking`] holds the
//! pure ordering and lock rules it delegates to.

pub mod categories;
pub mod locking;
pub mod manager;

use taskflow_proto::category::CategoryId;
use taskflow_proto::task::TaskId;

pub use categories::CategorySet;
pub use manager::{ChecklistManager, Command, CommandId, MoveOutcome, RollbackReport, WritePlan};

/// Errors from checklist mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecklistError {
    /// Task text was empty after trimming.
    #[error("task text cannot be empty")]
    EmptyText,
    /// Task text exceeded the maximum length.
    #[error("task text too long (max {0} characters)")]
    TextTooLong(usize),
    /// Another task already carries this exact text.
    #[error("a task with this text already exists: {0:?}")]
    DuplicateText(String),
    /// No task with the given id exists.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The task is locked and cannot be toggled.
    #[error("task is locked: {0}")]
    TaskLocked(TaskId),
}

/// Errors from category mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    /// Category name was empty after trimming.
    #[error("category name cannot be empty")]
    EmptyName,
    /// Category name exceeded the maximum length.
    #[error("category name too long (max {0} characters)")]
    NameTooLong(usize),
    /// No category with the given id exists.
    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),
}
