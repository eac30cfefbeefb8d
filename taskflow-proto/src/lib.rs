//! Shared record and wire format definitions for `TaskFlow`.

pub mod category;
pub mod store;
pub mod task;
