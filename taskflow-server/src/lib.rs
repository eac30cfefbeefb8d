//! `TaskFlow` document store server library.
//!
//! Exposes the store server for use in tests and embedding. The server
//! accepts WebSocket connections, partitions task and category documents by
//! user, and pushes full snapshots to every connection of a user after each
//! committed mutation.

pub mod config;
pub mod documents;
pub mod server;
