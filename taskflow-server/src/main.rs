//! `TaskFlow` document store server -- per-user task and category storage.
//!
//! An axum WebSocket server that stores task and category documents
//! partitioned by user and pushes full snapshots to every connection of a
//! user after each committed write.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9100
//! cargo run --bin taskflow-server
//!
//! # Run on custom address
//! cargo run --bin taskflow-server -- --bind 127.0.0.1:9100
//!
//! # Or via environment variable
//! TASKFLOW_SERVER_ADDR=127.0.0.1:9100 cargo run --bin taskflow-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskflow_server::config::{ServerCliArgs, ServerConfig};
use taskflow_server::documents::DocumentStore;
use taskflow_server::server::{self, ServerState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskflow store server");

    let documents = DocumentStore::with_max_tasks(config.max_tasks_per_user);
    let state = Arc::new(ServerState::with_documents(documents));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "store server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "store server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start store server");
            std::process::exit(1);
        }
    }
}
