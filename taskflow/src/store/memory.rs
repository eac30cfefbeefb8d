//! In-process store backend.
//!
//! Mirrors the server's document semantics (atomic batches, full-snapshot
//! pushes after every commit) without a network hop. Tests use
//! [`MemoryStore::fail_next_writes`] to make specific writes fail and
//! exercise the rollback path.

use std::collections::HashMap;

use tokio::sync::mpsc;

use taskflow_proto::category::{CategoryId, CategoryRecord};
use taskflow_proto::task::{TaskId, TaskRecord};

use crate::checklist::WritePlan;

use super::{StoreError, StoreEvent, TaskStore};

/// In-memory document store for one user.
pub struct MemoryStore {
    tasks: HashMap<TaskId, TaskRecord>,
    categories: HashMap<CategoryId, CategoryRecord>,
    fail_remaining: u32,
    event_tx: mpsc::UnboundedSender<StoreEvent>,
    event_rx: mpsc::UnboundedReceiver<StoreEvent>,
}

impl MemoryStore {
    /// Creates an empty store and queues the initial (empty) snapshots,
    /// matching the greeting a remote store sends on connect.
    #[must_use]
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let store = Self {
            tasks: HashMap::new(),
            categories: HashMap::new(),
            fail_remaining: 0,
            event_tx,
            event_rx,
        };
        store.push_task_snapshot();
        store.push_category_snapshot();
        store
    }

    /// Makes the next `count` submitted writes fail with a rejection.
    pub fn fail_next_writes(&mut self, count: u32) {
        self.fail_remaining = count;
    }

    /// Stored tasks in sequence order.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks
    }

    /// Stored categories in creation order.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryRecord> {
        let mut categories: Vec<CategoryRecord> = self.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        categories
    }

    fn apply(&mut self, plan: &WritePlan) -> Result<(), StoreError> {
        let now = now_ms();
        match plan {
            WritePlan::CreateTask(record) => {
                if self.tasks.contains_key(&record.id) {
                    return Err(StoreError::Rejected(format!(
                        "task already exists: {}",
                        record.id
                    )));
                }
                self.tasks.insert(record.id, record.clone());
            }
            WritePlan::UpdateTask(id, patch) => {
                let record = self
                    .tasks
                    .get_mut(id)
                    .ok_or_else(|| StoreError::Rejected(format!("task not found: {id}")))?;
                patch.apply_to(record, now);
            }
            WritePlan::DeleteTask(id) => {
                if self.tasks.remove(id).is_none() {
                    return Err(StoreError::Rejected(format!("task not found: {id}")));
                }
            }
            WritePlan::BatchUpdate(patches) => {
                // All-or-nothing: verify every target before touching any.
                for (id, _) in patches {
                    if !self.tasks.contains_key(id) {
                        return Err(StoreError::Rejected(format!("task not found: {id}")));
                    }
                }
                for (id, patch) in patches {
                    if let Some(record) = self.tasks.get_mut(id) {
                        patch.apply_to(record, now);
                    }
                }
            }
            WritePlan::CreateCategory(record) => {
                if self.categories.contains_key(&record.id) {
                    return Err(StoreError::Rejected(format!(
                        "category already exists: {}",
                        record.id
                    )));
                }
                self.categories.insert(record.id, record.clone());
            }
            WritePlan::UpdateCategory(id, patch) => {
                let record = self
                    .categories
                    .get_mut(id)
                    .ok_or_else(|| StoreError::Rejected(format!("category not found: {id}")))?;
                patch.apply_to(record, now);
            }
            WritePlan::DeleteCategory(id) => {
                if self.categories.remove(id).is_none() {
                    return Err(StoreError::Rejected(format!("category not found: {id}")));
                }
            }
        }
        Ok(())
    }

    fn push_task_snapshot(&self) {
        let _ = self.event_tx.send(StoreEvent::Tasks(self.tasks()));
    }

    fn push_category_snapshot(&self) {
        let _ = self.event_tx.send(StoreEvent::Categories(self.categories()));
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for MemoryStore {
    async fn submit(&mut self, plan: &WritePlan) -> Result<(), StoreError> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(StoreError::Rejected("injected write failure".to_string()));
        }
        self.apply(plan)?;
        match plan {
            WritePlan::CreateTask(_)
            | WritePlan::UpdateTask(..)
            | WritePlan::DeleteTask(_)
            | WritePlan::BatchUpdate(_) => self.push_task_snapshot(),
            WritePlan::CreateCategory(_)
            | WritePlan::UpdateCategory(..)
            | WritePlan::DeleteCategory(_) => self.push_category_snapshot(),
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Result<StoreEvent, StoreError> {
        self.event_rx.recv().await.ok_or(StoreError::Closed)
    }
}
