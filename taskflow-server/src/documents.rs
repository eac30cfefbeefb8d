//! In-memory per-user document storage for tasks and categories.
//!
//! The [`DocumentStore`] holds each user's task and category records behind a
//! single lock so that a [`StoreRequest::BatchUpdate`] either applies every
//! patch or none of them. Snapshots are produced sorted the way clients read
//! them: tasks by `order` (ties by `created_at`, then `id`), categories by
//! `created_at`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use taskflow_proto::category::{CategoryId, CategoryRecord};
use taskflow_proto::store::StoreRequest;
use taskflow_proto::task::{TaskId, TaskRecord};
use tokio::sync::RwLock;

/// Default maximum number of tasks stored per user.
const DEFAULT_MAX_TASKS_PER_USER: usize = 500;

/// Errors produced while applying a store request.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A create used an id that already exists.
    #[error("task {0} already exists")]
    TaskExists(TaskId),

    /// The referenced task does not exist for this user.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A create used an id that already exists.
    #[error("category {0} already exists")]
    CategoryExists(CategoryId),

    /// The referenced category does not exist for this user.
    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),

    /// The record named a different user than the connection.
    #[error("record user {record} does not match connection user {connection}")]
    UserMismatch {
        /// Owner named in the record.
        record: String,
        /// User the connection opened with.
        connection: String,
    },

    /// The user's task list is at the configured cap.
    #[error("task limit reached ({0} tasks)")]
    TaskLimit(usize),

    /// `Hello` arrived on an already-open connection.
    #[error("connection is already open")]
    AlreadyOpen,
}

/// Which document collection a committed request changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Changed {
    /// The user's task list changed.
    Tasks,
    /// The user's category list changed.
    Categories,
}

/// One user's documents.
#[derive(Debug, Default)]
struct UserDocuments {
    tasks: HashMap<TaskId, TaskRecord>,
    categories: HashMap<CategoryId, CategoryRecord>,
}

/// In-memory document store partitioned by user.
///
/// Thread-safe via [`RwLock`]. Mutations validate fully before touching any
/// record, so a failed request never leaves a partial effect.
pub struct DocumentStore {
    users: RwLock<HashMap<String, UserDocuments>>,
    max_tasks_per_user: usize,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Creates an empty store with the default per-user task cap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            max_tasks_per_user: DEFAULT_MAX_TASKS_PER_USER,
        }
    }

    /// Creates an empty store with a custom per-user task cap.
    #[must_use]
    pub fn with_max_tasks(max_tasks_per_user: usize) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            max_tasks_per_user,
        }
    }

    /// Applies a mutation request on behalf of `user_id`.
    ///
    /// Returns which collection changed so the caller knows which snapshot to
    /// push. `Hello` is rejected here; the connection handler consumes it
    /// before any call into the store.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] and applies nothing when validation fails.
    pub async fn apply(
        &self,
        user_id: &str,
        request: &StoreRequest,
    ) -> Result<Changed, DocumentError> {
        let mut users = self.users.write().await;
        let docs = users.entry(user_id.to_string()).or_default();
        let now = now_ms();

        match request {
            StoreRequest::Hello { .. } => Err(DocumentError::AlreadyOpen),
            StoreRequest::CreateTask { record, .. } => {
                if record.user_id != user_id {
                    return Err(DocumentError::UserMismatch {
                        record: record.user_id.clone(),
                        connection: user_id.to_string(),
                    });
                }
                if docs.tasks.contains_key(&record.id) {
                    return Err(DocumentError::TaskExists(record.id));
                }
                if docs.tasks.len() >= self.max_tasks_per_user {
                    return Err(DocumentError::TaskLimit(self.max_tasks_per_user));
                }
                docs.tasks.insert(record.id, record.clone());
                Ok(Changed::Tasks)
            }
            StoreRequest::UpdateTask { id, patch, .. } => {
                let record = docs.tasks.get_mut(id).ok_or(DocumentError::TaskNotFound(*id))?;
                patch.apply_to(record, now);
                Ok(Changed::Tasks)
            }
            StoreRequest::DeleteTask { id, .. } => {
                docs.tasks
                    .remove(id)
                    .ok_or(DocumentError::TaskNotFound(*id))?;
                Ok(Changed::Tasks)
            }
            StoreRequest::BatchUpdate { patches, .. } => {
                // Validate every id before applying any patch.
                for (id, _) in patches {
                    if !docs.tasks.contains_key(id) {
                        return Err(DocumentError::TaskNotFound(*id));
                    }
                }
                for (id, patch) in patches {
                    if let Some(record) = docs.tasks.get_mut(id) {
                        patch.apply_to(record, now);
                    }
                }
                Ok(Changed::Tasks)
            }
            StoreRequest::CreateCategory { record, .. } => {
                if record.user_id != user_id {
                    return Err(DocumentError::UserMismatch {
                        record: record.user_id.clone(),
                        connection: user_id.to_string(),
                    });
                }
                if docs.categories.contains_key(&record.id) {
                    return Err(DocumentError::CategoryExists(record.id));
                }
                docs.categories.insert(record.id, record.clone());
                Ok(Changed::Categories)
            }
            StoreRequest::UpdateCategory { id, patch, .. } => {
                let record = docs
                    .categories
                    .get_mut(id)
                    .ok_or(DocumentError::CategoryNotFound(*id))?;
                patch.apply_to(record, now);
                Ok(Changed::Categories)
            }
            StoreRequest::DeleteCategory { id, .. } => {
                // Tasks referencing the category keep their dangling reference.
                docs.categories
                    .remove(id)
                    .ok_or(DocumentError::CategoryNotFound(*id))?;
                Ok(Changed::Categories)
            }
        }
    }

    /// Returns all of a user's tasks in sequence order.
    pub async fn task_snapshot(&self, user_id: &str) -> Vec<TaskRecord> {
        let users = self.users.read().await;
        let mut tasks: Vec<TaskRecord> = users
            .get(user_id)
            .map(|docs| docs.tasks.values().cloned().collect())
            .unwrap_or_default();
        tasks.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        tasks
    }

    /// Returns all of a user's categories, oldest first.
    pub async fn category_snapshot(&self, user_id: &str) -> Vec<CategoryRecord> {
        let users = self.users.read().await;
        let mut categories: Vec<CategoryRecord> = users
            .get(user_id)
            .map(|docs| docs.categories.values().cloned().collect())
            .unwrap_or_default();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        categories
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
