//! Task record types for `TaskFlow`.
//!
//! A [`TaskRecord`] is the persisted shape of a checklist task. The `locked`
//! field is carried for display parity with the stored copy but is never
//! authoritative: clients recompute lock state locally from `completed` and
//! sequence order after every read.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::CategoryId;

/// Maximum allowed task text length in characters.
pub const MAX_TASK_TEXT_LENGTH: usize = 256;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted checklist task.
///
/// `order` defines the total sequence position within a user's list; ties
/// (never produced by a single client) break by `created_at`, then `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task identifier (UUID v7, time-ordered).
    pub id: TaskId,
    /// Owner of this task; partition key for all store queries.
    pub user_id: String,
    /// Task text, non-empty and at most [`MAX_TASK_TEXT_LENGTH`] characters.
    pub text: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Derived lock flag. Ignored on read; recomputed locally.
    pub locked: bool,
    /// Position in the user's sequence (0-based, contiguous).
    pub order: u32,
    /// Optional category reference. May dangle after category deletion.
    pub category_id: Option<CategoryId>,
    /// Creation time, milliseconds since epoch.
    pub created_at: u64,
    /// Last mutation time, milliseconds since epoch.
    pub updated_at: u64,
}

/// A partial update to a task record.
///
/// Fields left as `None` are unchanged. `category_id` uses a double `Option`
/// so that `Some(None)` clears the reference while `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New task text.
    pub text: Option<String>,
    /// New completion state.
    pub completed: Option<bool>,
    /// New (derived) lock flag, written for display parity only.
    pub locked: Option<bool>,
    /// New sequence position.
    pub order: Option<u32>,
    /// New category reference; `Some(None)` clears it.
    pub category_id: Option<Option<CategoryId>>,
}

impl TaskPatch {
    /// Returns `true` if this patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.completed.is_none()
            && self.locked.is_none()
            && self.order.is_none()
            && self.category_id.is_none()
    }

    /// Applies this patch to a record in place, bumping `updated_at`.
    pub fn apply_to(&self, record: &mut TaskRecord, now_ms: u64) {
        if let Some(ref text) = self.text {
            record.text = text.clone();
        }
        if let Some(completed) = self.completed {
            record.completed = completed;
        }
        if let Some(locked) = self.locked {
            record.locked = locked;
        }
        if let Some(order) = self.order {
            record.order = order;
        }
        if let Some(ref category_id) = self.category_id {
            record.category_id = *category_id;
        }
        record.updated_at = now_ms;
    }
}
