//! `TaskFlow` — terminal-native sequential checklist library.

pub mod app;
pub mod auth;
pub mod checklist;
pub mod config;
pub mod store;
pub mod sync;
pub mod ui;
