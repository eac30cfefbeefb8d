//! Sync coordinator wiring the TUI to the async store backend.
//!
//! The TUI event loop is synchronous (crossterm poll based) while the store
//! is async, so a background tokio task owns the [`TaskStore`] and the two
//! sides talk over channels:
//!
//! ```text
//! TUI (main thread)  ←── SyncEvent ───  store task
//!                     ─── SyncCommand →
//! ```
//!
//! The store task handles one write at a time: a [`SyncCommand::Submit`] is
//! awaited to completion before the next command is taken, so writes reach
//! the store in submission order. The app keeps at most one submit
//! outstanding and pumps the next only after the verdict arrives, which is
//! what lets a failed write roll back cleanly before anything later hits
//! the store.

use tokio::sync::mpsc;

use taskflow_proto::category::CategoryRecord;
use taskflow_proto::task::TaskRecord;

use crate::checklist::WritePlan;
use crate::store::{StoreError, StoreEvent, TaskStore};

/// Channel capacity for commands and events.
const CHANNEL_CAPACITY: usize = 256;

/// Identifier for one submitted write, minted by the app.
///
/// Distinct from the checklist's command ids because category writes have
/// no checklist command behind them; the app keeps the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Wraps an app-chosen sequence number.
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Commands from the TUI main loop to the store task.
#[derive(Debug)]
pub enum SyncCommand {
    /// Submit one write plan to the store.
    Submit {
        /// The app's id for this write.
        job: JobId,
        /// What to write.
        plan: WritePlan,
    },
    /// Gracefully shut down the store task.
    Shutdown,
}

/// Events from the store task to the TUI main loop.
#[derive(Debug)]
pub enum SyncEvent {
    /// The store committed this write.
    Committed {
        /// The job whose write landed.
        job: JobId,
    },
    /// The store refused this write; nothing was applied.
    WriteFailed {
        /// The job whose write failed.
        job: JobId,
        /// Human-readable failure reason.
        reason: String,
    },
    /// The store pushed a full task snapshot.
    TasksChanged(Vec<TaskRecord>),
    /// The store pushed a full category snapshot.
    CategoriesChanged(Vec<CategoryRecord>),
    /// The store connection ended; no further writes will commit.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
}

/// Spawns the store task and returns the channel handles.
///
/// The task owns `store` and runs until [`SyncCommand::Shutdown`], the
/// command channel closing, or the store connection ending.
#[must_use]
pub fn spawn_sync<S>(store: S) -> (mpsc::Sender<SyncCommand>, mpsc::Receiver<SyncEvent>)
where
    S: TaskStore + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel::<SyncCommand>(CHANNEL_CAPACITY);
    let (evt_tx, evt_rx) = mpsc::channel::<SyncEvent>(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        store_loop(store, cmd_rx, evt_tx).await;
    });
    (cmd_tx, evt_rx)
}

/// One wakeup of the store loop.
enum Step {
    Cmd(Option<SyncCommand>),
    Event(Result<StoreEvent, StoreError>),
}

/// Background task: serialize writes and forward snapshot pushes.
async fn store_loop<S: TaskStore>(
    mut store: S,
    mut cmd_rx: mpsc::Receiver<SyncCommand>,
    evt_tx: mpsc::Sender<SyncEvent>,
) {
    loop {
        // The select only picks what woke us; the store is borrowed again
        // afterwards for the actual submit.
        let step = tokio::select! {
            cmd = cmd_rx.recv() => Step::Cmd(cmd),
            event = store.next_event() => Step::Event(event),
        };
        match step {
            Step::Cmd(Some(SyncCommand::Submit { job, plan })) => {
                let event = match store.submit(&plan).await {
                    Ok(()) => SyncEvent::Committed { job },
                    Err(StoreError::Closed) => {
                        let _ = evt_tx
                            .send(SyncEvent::Disconnected {
                                reason: StoreError::Closed.to_string(),
                            })
                            .await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(job = %job, err = %e, "store write failed");
                        SyncEvent::WriteFailed {
                            job,
                            reason: e.to_string(),
                        }
                    }
                };
                if evt_tx.send(event).await.is_err() {
                    break;
                }
            }
            Step::Cmd(Some(SyncCommand::Shutdown) | None) => {
                tracing::info!("store task shutting down");
                break;
            }
            Step::Event(Ok(StoreEvent::Tasks(tasks))) => {
                if evt_tx.send(SyncEvent::TasksChanged(tasks)).await.is_err() {
                    break;
                }
            }
            Step::Event(Ok(StoreEvent::Categories(categories))) => {
                if evt_tx
                    .send(SyncEvent::CategoriesChanged(categories))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Step::Event(Err(e)) => {
                tracing::warn!(err = %e, "store connection ended");
                let _ = evt_tx
                    .send(SyncEvent::Disconnected {
                        reason: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }
}
