//! Optimistic checklist state manager.
//!
//! [`ChecklistManager`] owns the in-memory task list for one user and applies
//! every mutation optimistically: the list changes immediately, a
//! [`WritePlan`] describing the persistence write is handed to the caller,
//! and the command sits in a pending queue until the store confirms or
//! rejects it. On rejection the manager restores the snapshot taken before
//! the failed command and replays the commands queued after it, dropping any
//! that no longer validate against the restored state.
//!
//! Store snapshots received while writes are pending are deferred rather
//! than applied, so a stale read can never clobber optimistic local state.

use std::collections::VecDeque;

use taskflow_proto::category::{CategoryId, CategoryPatch, CategoryRecord};
use taskflow_proto::task::{MAX_TASK_TEXT_LENGTH, TaskId, TaskPatch, TaskRecord};

use super::ChecklistError;
use super::locking;

/// Task texts seeded into a brand-new empty checklist.
pub const DEFAULT_TASK_TEXTS: [&str; 6] = [
    "Check wind speed",
    "Inspect gear",
    "Load gear in van",
    "Drive to beach",
    "Set up sail",
    "Begin windsurfing",
];

/// Identifier for a pending optimistic command, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// A replayable checklist mutation.
///
/// Commands are kept in the pending queue so that a rollback can re-execute
/// them against the restored state. `Add` carries the full record so a
/// replayed insertion keeps its original id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a new task.
    Add {
        /// The record to insert; `order` and `locked` are recomputed.
        record: TaskRecord,
    },
    /// Flip a task's completion state.
    Toggle {
        /// Target task.
        id: TaskId,
    },
    /// Replace a task's text.
    EditText {
        /// Target task.
        id: TaskId,
        /// New text, already trimmed and validated for shape.
        text: String,
    },
    /// Remove a task.
    Delete {
        /// Target task.
        id: TaskId,
    },
    /// Move a task to a new sequence position.
    Move {
        /// Target task.
        id: TaskId,
        /// Destination position, 0-based.
        to_index: usize,
    },
    /// Set or clear a task's category reference.
    AssignCategory {
        /// Target task.
        id: TaskId,
        /// New reference; `None` clears it.
        category_id: Option<CategoryId>,
    },
    /// Mark every task uncompleted.
    ResetAll,
}

/// The persistence write a committed command requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePlan {
    /// Store a new task record.
    CreateTask(TaskRecord),
    /// Patch one task record.
    UpdateTask(TaskId, TaskPatch),
    /// Remove one task record.
    DeleteTask(TaskId),
    /// Patch several task records atomically.
    BatchUpdate(Vec<(TaskId, TaskPatch)>),
    /// Store a new category record.
    CreateCategory(CategoryRecord),
    /// Patch one category record.
    UpdateCategory(CategoryId, CategoryPatch),
    /// Remove one category record.
    DeleteCategory(CategoryId),
}

/// Result of a move request.
///
/// A move that violates the ordering rules is not an error; the list is
/// simply left unchanged and nothing is queued for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move applied and is pending persistence.
    Moved(CommandId),
    /// The move was not permitted; state is unchanged.
    Rejected,
}

/// What a rollback did to the pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    /// The command whose write failed.
    pub failed: CommandId,
    /// Commands replayed on top of the restored state, with their
    /// regenerated write plans. These must be re-submitted to the store.
    pub reapplied: Vec<(CommandId, WritePlan)>,
    /// Commands that no longer validated after the rollback and were
    /// discarded.
    pub dropped: Vec<CommandId>,
}

struct PendingEntry {
    id: CommandId,
    command: Command,
    /// Task list as it was before this command executed.
    snapshot: Vec<TaskRecord>,
    plan: WritePlan,
}

/// In-memory checklist state for one user with optimistic persistence.
pub struct ChecklistManager {
    user_id: String,
    tasks: Vec<TaskRecord>,
    pending: VecDeque<PendingEntry>,
    deferred_snapshot: Option<Vec<TaskRecord>>,
    next_command_id: u64,
}

impl ChecklistManager {
    /// Creates an empty manager for the given user.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tasks: Vec::new(),
            pending: VecDeque::new(),
            deferred_snapshot: None,
            next_command_id: 0,
        }
    }

    /// The owning user's id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current task list in sequence order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of commands awaiting store confirmation.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The write plan queued for a pending command.
    #[must_use]
    pub fn write_plan(&self, id: CommandId) -> Option<&WritePlan> {
        self.pending.iter().find(|e| e.id == id).map(|e| &e.plan)
    }

    /// Completed share of the list, rounded to the nearest percent.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let done = self.tasks.iter().filter(|t| t.completed).count();
        let percent = (done * 100 + self.tasks.len() / 2) / self.tasks.len();
        u8::try_from(percent).unwrap_or(100)
    }

    /// Appends a new task at the end of the list.
    ///
    /// # Errors
    ///
    /// Fails when the trimmed text is empty, too long, or duplicates an
    /// existing task (case-insensitively).
    pub fn add_task(
        &mut self,
        text: &str,
        category_id: Option<CategoryId>,
    ) -> Result<(TaskId, CommandId), ChecklistError> {
        let text = validate_text_shape(text)?;
        let now = now_ms();
        let record = TaskRecord {
            id: TaskId::new(),
            user_id: self.user_id.clone(),
            text,
            completed: false,
            locked: false,
            order: 0,
            category_id,
            created_at: now,
            updated_at: now,
        };
        let task_id = record.id;
        match self.push_command(Command::Add { record })? {
            Some(command_id) => Ok((task_id, command_id)),
            // Add always produces a write plan.
            None => Err(ChecklistError::TaskNotFound(task_id)),
        }
    }

    /// Flips a task's completion state and recomputes every lock.
    ///
    /// # Errors
    ///
    /// Fails when the task does not exist or is locked.
    pub fn toggle_task(&mut self, id: TaskId) -> Result<CommandId, ChecklistError> {
        match self.push_command(Command::Toggle { id })? {
            Some(command_id) => Ok(command_id),
            None => Err(ChecklistError::TaskNotFound(id)),
        }
    }

    /// Replaces a task's text.
    ///
    /// # Errors
    ///
    /// Fails when the task does not exist or the trimmed text is empty, too
    /// long, or duplicates another task.
    pub fn edit_task_text(&mut self, id: TaskId, text: &str) -> Result<CommandId, ChecklistError> {
        let text = validate_text_shape(text)?;
        match self.push_command(Command::EditText { id, text })? {
            Some(command_id) => Ok(command_id),
            None => Err(ChecklistError::TaskNotFound(id)),
        }
    }

    /// Removes a task. Locked and completed tasks may be deleted; locks are
    /// recomputed over the survivors.
    ///
    /// # Errors
    ///
    /// Fails when the task does not exist.
    pub fn delete_task(&mut self, id: TaskId) -> Result<CommandId, ChecklistError> {
        match self.push_command(Command::Delete { id })? {
            Some(command_id) => Ok(command_id),
            None => Err(ChecklistError::TaskNotFound(id)),
        }
    }

    /// Moves a task to a new position if the ordering rules permit it.
    ///
    /// # Errors
    ///
    /// Fails only when the task does not exist; a rule violation returns
    /// [`MoveOutcome::Rejected`] and changes nothing.
    pub fn move_task(
        &mut self,
        id: TaskId,
        to_index: usize,
    ) -> Result<MoveOutcome, ChecklistError> {
        if self.task(id).is_none() {
            return Err(ChecklistError::TaskNotFound(id));
        }
        match self.push_command(Command::Move { id, to_index })? {
            Some(command_id) => Ok(MoveOutcome::Moved(command_id)),
            None => Ok(MoveOutcome::Rejected),
        }
    }

    /// Sets or clears a task's category reference.
    ///
    /// # Errors
    ///
    /// Fails when the task does not exist.
    pub fn assign_category(
        &mut self,
        id: TaskId,
        category_id: Option<CategoryId>,
    ) -> Result<CommandId, ChecklistError> {
        match self.push_command(Command::AssignCategory { id, category_id })? {
            Some(command_id) => Ok(command_id),
            None => Err(ChecklistError::TaskNotFound(id)),
        }
    }

    /// Marks every task uncompleted and relocks all but the head.
    ///
    /// Returns `None` when the list is empty.
    pub fn reset_all(&mut self) -> Option<CommandId> {
        // ResetAll never fails validation.
        self.push_command(Command::ResetAll).ok().flatten()
    }

    /// Seeds the default checklist into an empty list.
    ///
    /// Does nothing when the list already has tasks. Each seeded task is its
    /// own pending command with its own create write.
    pub fn seed_defaults(&mut self) -> Vec<CommandId> {
        if !self.tasks.is_empty() {
            return Vec::new();
        }
        let mut ids = Vec::with_capacity(DEFAULT_TASK_TEXTS.len());
        for text in DEFAULT_TASK_TEXTS {
            if let Ok((_, command_id)) = self.add_task(text, None) {
                ids.push(command_id);
            }
        }
        ids
    }

    /// Marks a pending command as committed by the store.
    ///
    /// When the queue drains, any snapshot deferred during the write burst is
    /// applied.
    pub fn confirm(&mut self, id: CommandId) {
        if let Some(pos) = self.pending.iter().position(|e| e.id == id) {
            self.pending.remove(pos);
        }
        if self.pending.is_empty() {
            self.apply_deferred();
        }
    }

    /// Rolls back a pending command whose write failed.
    ///
    /// Restores the task list to its state before the failed command, then
    /// replays every command queued after it. Replayed commands get fresh
    /// write plans (positions may have shifted); commands that no longer
    /// validate are dropped. The caller must re-submit the reapplied plans.
    pub fn reject(&mut self, id: CommandId) -> RollbackReport {
        let mut report = RollbackReport {
            failed: id,
            reapplied: Vec::new(),
            dropped: Vec::new(),
        };
        let Some(pos) = self.pending.iter().position(|e| e.id == id) else {
            return report;
        };
        let mut tail = Vec::from(self.pending.split_off(pos));
        let failed = tail.remove(0);
        self.tasks = failed.snapshot;
        for entry in tail {
            let snapshot = self.tasks.clone();
            match self.execute(&entry.command) {
                Ok(Some(plan)) => {
                    report.reapplied.push((entry.id, plan.clone()));
                    self.pending.push_back(PendingEntry {
                        id: entry.id,
                        command: entry.command,
                        snapshot,
                        plan,
                    });
                }
                Ok(None) | Err(_) => report.dropped.push(entry.id),
            }
        }
        if self.pending.is_empty() {
            self.apply_deferred();
        }
        report
    }

    /// Applies a full task snapshot pushed by the store.
    ///
    /// Returns `false` when writes are pending; the snapshot is then held
    /// back and applied once the queue drains. Stored `locked` flags are
    /// ignored and recomputed.
    pub fn apply_task_snapshot(&mut self, records: Vec<TaskRecord>) -> bool {
        if !self.pending.is_empty() {
            self.deferred_snapshot = Some(records);
            return false;
        }
        self.tasks = into_sequence(records);
        self.deferred_snapshot = None;
        true
    }

    fn apply_deferred(&mut self) {
        if let Some(records) = self.deferred_snapshot.take() {
            self.tasks = into_sequence(records);
        }
    }

    /// Executes a command optimistically and queues it as pending.
    ///
    /// `Ok(None)` means the command was a valid no-op (rejected move, reset
    /// of an empty list) and nothing was queued.
    fn push_command(&mut self, command: Command) -> Result<Option<CommandId>, ChecklistError> {
        let snapshot = self.tasks.clone();
        match self.execute(&command)? {
            Some(plan) => {
                self.next_command_id += 1;
                let id = CommandId(self.next_command_id);
                tracing::debug!(command = %id, ?plan, "queued optimistic write");
                self.pending.push_back(PendingEntry {
                    id,
                    command,
                    snapshot,
                    plan,
                });
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Runs a command against the current task list.
    ///
    /// Shared between the optimistic path and rollback replay, so every
    /// state-dependent check lives here and is re-evaluated on replay.
    fn execute(&mut self, command: &Command) -> Result<Option<WritePlan>, ChecklistError> {
        match command {
            Command::Add { record } => {
                if self.has_duplicate_text(&record.text, None) {
                    return Err(ChecklistError::DuplicateText(record.text.clone()));
                }
                let mut record = record.clone();
                record.order = u32::try_from(self.tasks.len()).unwrap_or(u32::MAX);
                record.locked = locking::lock_for_append(&self.tasks);
                self.tasks.push(record.clone());
                Ok(Some(WritePlan::CreateTask(record)))
            }
            Command::Toggle { id } => {
                let index = self.index_of(*id)?;
                if self.tasks[index].locked {
                    return Err(ChecklistError::TaskLocked(*id));
                }
                self.tasks[index].completed = !self.tasks[index].completed;
                self.tasks[index].updated_at = now_ms();
                locking::recompute_locks(&mut self.tasks);
                Ok(Some(WritePlan::UpdateTask(
                    *id,
                    TaskPatch {
                        completed: Some(self.tasks[index].completed),
                        locked: Some(self.tasks[index].locked),
                        ..TaskPatch::default()
                    },
                )))
            }
            Command::EditText { id, text } => {
                let index = self.index_of(*id)?;
                if self.has_duplicate_text(text, Some(*id)) {
                    return Err(ChecklistError::DuplicateText(text.clone()));
                }
                self.tasks[index].text = text.clone();
                self.tasks[index].updated_at = now_ms();
                Ok(Some(WritePlan::UpdateTask(
                    *id,
                    TaskPatch {
                        text: Some(text.clone()),
                        ..TaskPatch::default()
                    },
                )))
            }
            Command::Delete { id } => {
                let index = self.index_of(*id)?;
                self.tasks.remove(index);
                locking::renumber(&mut self.tasks);
                locking::recompute_locks(&mut self.tasks);
                Ok(Some(WritePlan::DeleteTask(*id)))
            }
            Command::Move { id, to_index } => {
                let from = self.index_of(*id)?;
                if !locking::apply_move(&mut self.tasks, from, *to_index) {
                    return Ok(None);
                }
                let patches = self
                    .tasks
                    .iter()
                    .map(|t| {
                        (
                            t.id,
                            TaskPatch {
                                order: Some(t.order),
                                locked: Some(t.locked),
                                ..TaskPatch::default()
                            },
                        )
                    })
                    .collect();
                Ok(Some(WritePlan::BatchUpdate(patches)))
            }
            Command::AssignCategory { id, category_id } => {
                let index = self.index_of(*id)?;
                self.tasks[index].category_id = *category_id;
                self.tasks[index].updated_at = now_ms();
                Ok(Some(WritePlan::UpdateTask(
                    *id,
                    TaskPatch {
                        category_id: Some(*category_id),
                        ..TaskPatch::default()
                    },
                )))
            }
            Command::ResetAll => {
                if self.tasks.is_empty() {
                    return Ok(None);
                }
                let now = now_ms();
                for task in &mut self.tasks {
                    task.completed = false;
                    task.updated_at = now;
                }
                locking::recompute_locks(&mut self.tasks);
                let patches = self
                    .tasks
                    .iter()
                    .map(|t| {
                        (
                            t.id,
                            TaskPatch {
                                completed: Some(false),
                                locked: Some(t.locked),
                                ..TaskPatch::default()
                            },
                        )
                    })
                    .collect();
                Ok(Some(WritePlan::BatchUpdate(patches)))
            }
        }
    }

    /// Case-insensitive duplicate check, optionally excluding one task (the
    /// one being edited).
    fn has_duplicate_text(&self, text: &str, exclude: Option<TaskId>) -> bool {
        let lowered = text.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| exclude != Some(t.id))
            .any(|t| t.text.to_lowercase() == lowered)
    }

    fn index_of(&self, id: TaskId) -> Result<usize, ChecklistError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(ChecklistError::TaskNotFound(id))
    }
}

/// Trims the text and checks emptiness and length. Duplicate checks are
/// state-dependent and happen at execute time.
fn validate_text_shape(text: &str) -> Result<String, ChecklistError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChecklistError::EmptyText);
    }
    if trimmed.chars().count() > MAX_TASK_TEXT_LENGTH {
        return Err(ChecklistError::TextTooLong(MAX_TASK_TEXT_LENGTH));
    }
    Ok(trimmed.to_string())
}

/// Sorts snapshot records into sequence order, renumbers them contiguously,
/// and recomputes locks, ignoring whatever order gaps and lock flags the
/// store carried.
fn into_sequence(mut records: Vec<TaskRecord>) -> Vec<TaskRecord> {
    locking::sort_into_sequence(&mut records);
    locking::renumber(&mut records);
    locking::recompute_locks(&mut records);
    records
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
