//! Persistence backends for the checklist.
//!
//! The [`TaskStore`] trait abstracts where records live: [`memory::MemoryStore`]
//! keeps them in-process for tests and offline use, [`remote::RemoteStore`]
//! talks to a `taskflow-server` document store over WebSocket. Both submit
//! one write at a time and push full snapshots back as events.

pub mod memory;
pub mod remote;

use taskflow_proto::category::CategoryRecord;
use taskflow_proto::task::TaskRecord;

use crate::checklist::WritePlan;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store connection ended and no further operations are possible.
    #[error("store connection closed")]
    Closed,
    /// The store refused this write; no partial effect was applied.
    #[error("store rejected the write: {0}")]
    Rejected(String),
    /// Transport failure talking to the store.
    #[error("store i/o error: {0}")]
    Io(String),
    /// A message could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(String),
    /// The store did not answer within the deadline.
    #[error("store request timed out")]
    Timeout,
}

/// A snapshot pushed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Full task list for the user.
    Tasks(Vec<TaskRecord>),
    /// Full category list for the user.
    Categories(Vec<CategoryRecord>),
}

/// A persistence backend for one user's checklist documents.
///
/// Writes are submitted one at a time; `submit` resolves only once the store
/// has durably accepted or refused the plan. Snapshot pushes arrive through
/// `next_event` and always carry full state.
pub trait TaskStore: Send {
    /// Submits a write plan and waits for the store's verdict.
    ///
    /// An `Err(StoreError::Rejected(_))` means the store refused the write
    /// atomically; the caller should roll back its optimistic state.
    fn submit(&mut self, plan: &WritePlan) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Waits for the next snapshot pushed by the store.
    ///
    /// Resolves to `Err(StoreError::Closed)` once the connection ends.
    fn next_event(&mut self) -> impl Future<Output = Result<StoreEvent, StoreError>> + Send;
}
