//! Document store wire protocol for `TaskFlow`.
//!
//! Defines the postcard-encoded messages exchanged between a client and the
//! `taskflow-server` document store over a WebSocket connection. A connection
//! opens with [`StoreRequest::Hello`] naming the user whose documents it
//! operates on; every mutation carries a client-chosen `request_id` that the
//! server echoes back in [`StoreResponse::Ack`] or [`StoreResponse::Error`].
//!
//! Snapshots are push-based and full-state: the server sends a
//! [`StoreResponse::TaskSnapshot`] / [`StoreResponse::CategorySnapshot`] pair
//! right after `Hello`, and again to every connection of the same user after
//! each committed mutation.

use serde::{Deserialize, Serialize};

use crate::category::{CategoryId, CategoryPatch, CategoryRecord};
use crate::task::{TaskId, TaskPatch, TaskRecord};

/// Client-to-server store requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreRequest {
    /// Opens the connection for a user's documents. Must be the first message.
    Hello {
        /// Partition key for all subsequent operations.
        user_id: String,
    },
    /// Creates a new task record.
    CreateTask {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// The record to store.
        record: TaskRecord,
    },
    /// Applies a partial update to an existing task.
    UpdateTask {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// Which task to update.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Deletes a task record.
    DeleteTask {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// Which task to delete.
        id: TaskId,
    },
    /// Applies several task patches atomically.
    ///
    /// Used for reordering and bulk reset so a partial write can never leave
    /// persisted `order` values inconsistent. Either every patch applies or
    /// none do.
    BatchUpdate {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// Patches to apply, all-or-nothing.
        patches: Vec<(TaskId, TaskPatch)>,
    },
    /// Creates a new category record.
    CreateCategory {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// The record to store.
        record: CategoryRecord,
    },
    /// Applies a partial update to an existing category.
    UpdateCategory {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// Which category to update.
        id: CategoryId,
        /// Fields to change.
        patch: CategoryPatch,
    },
    /// Deletes a category record. Referencing tasks are left untouched.
    DeleteCategory {
        /// Correlation id echoed in the ack.
        request_id: u64,
        /// Which category to delete.
        id: CategoryId,
    },
}

/// Server-to-client store responses and pushed snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreResponse {
    /// The request with this id committed.
    Ack {
        /// Correlation id from the request.
        request_id: u64,
    },
    /// The request with this id failed; no partial effect was applied.
    Error {
        /// Correlation id from the request.
        request_id: u64,
        /// Human-readable failure reason.
        reason: String,
    },
    /// Full task list for the connection's user, sorted by `order`.
    TaskSnapshot {
        /// All task records for the user.
        tasks: Vec<TaskRecord>,
    },
    /// Full category list for the connection's user.
    CategorySnapshot {
        /// All category records for the user.
        categories: Vec<CategoryRecord>,
    },
}

/// Encodes a [`StoreRequest`] into bytes using postcard.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn encode_request(msg: &StoreRequest) -> Result<Vec<u8>, String> {
    postcard::to_allocvec(msg).map_err(|e| format!("store request encode error: {e}"))
}

/// Decodes a [`StoreRequest`] from bytes using postcard.
///
/// # Errors
///
/// Returns an error string if deserialization fails.
pub fn decode_request(bytes: &[u8]) -> Result<StoreRequest, String> {
    postcard::from_bytes(bytes).map_err(|e| format!("store request decode error: {e}"))
}

/// Encodes a [`StoreResponse`] into bytes using postcard.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn encode_response(msg: &StoreResponse) -> Result<Vec<u8>, String> {
    postcard::to_allocvec(msg).map_err(|e| format!("store response encode error: {e}"))
}

/// Decodes a [`StoreResponse`] from bytes using postcard.
///
/// # Errors
///
/// Returns an error string if deserialization fails.
pub fn decode_response(bytes: &[u8]) -> Result<StoreResponse, String> {
    postcard::from_bytes(bytes).map_err(|e| format!("store response decode error: {e}"))
}
