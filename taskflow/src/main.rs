//! `TaskFlow` — terminal-native sequential checklist.
//!
//! Launches the TUI, signs the user in, and syncs the checklist against a
//! document store server or an in-process store. Configuration via CLI
//! flags, environment variables, or config file
//! (`~/.config/taskflow/config.toml`).
//!
//! ```bash
//! # Offline, in-process store
//! cargo run --bin taskflow
//!
//! # Against a document store server
//! cargo run --bin taskflow -- --server-url ws://127.0.0.1:9100/store
//! ```

use std::io;
use std::path::Path;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskflow::app::App;
use taskflow::auth::{AuthProvider, LocalAuthProvider};
use taskflow::config::{CliArgs, ClientConfig};
use taskflow::store::memory::MemoryStore;
use taskflow::store::remote::RemoteStore;
use taskflow::sync::{self, SyncCommand, SyncEvent};
use taskflow::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskflow starting");

    let mut auth = match config.accounts_path() {
        Ok(path) => LocalAuthProvider::load(&path).unwrap_or_else(|e| {
            eprintln!("Warning: could not load accounts file: {e}");
            LocalAuthProvider::in_memory()
        }),
        Err(e) => {
            eprintln!("Warning: no config directory ({e}); accounts will not persist");
            LocalAuthProvider::in_memory()
        }
    };

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, &config, &mut auth).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskflow exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the
/// terminal). Returns a [`WorkerGuard`] that must be held until shutdown to
/// ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskflow.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
    auth: &mut LocalAuthProvider,
) -> io::Result<()> {
    let mut app = App::new(config);
    let mut channels: Option<(mpsc::Sender<SyncCommand>, mpsc::Receiver<SyncEvent>)> = None;

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain store events and pump the next due write.
        if let Some((ref tx, ref mut rx)) = channels {
            while let Ok(event) = rx.try_recv() {
                app.apply_sync_event(event);
            }
            if let Some(cmd) = app.next_sync_command()
                && tx.try_send(cmd).is_err()
            {
                app.connected = false;
                app.notice = Some("store task is gone; change not persisted".to_string());
            }
        }

        // Step 3: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key_event(key);
        }

        // Step 4: Complete a submitted sign-in form.
        if let Some(request) = app.take_sign_in_request() {
            let outcome = match request.display_name {
                Some(ref name) => auth.sign_up(&request.email, name, &request.password),
                None => auth.sign_in(&request.email, &request.password),
            };
            match outcome {
                Ok(profile) => {
                    channels = Some(connect_store(config, &profile.user_id, &mut app).await);
                    app.signed_in(profile);
                }
                Err(e) => app.sign_in_failed(e.to_string()),
            }
        }

        if app.should_quit {
            if let Some((ref tx, _)) = channels {
                let _ = tx.try_send(SyncCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Spawns the store task for a signed-in user.
///
/// Falls back to the in-process store when no server is configured or the
/// configured server cannot be reached.
async fn connect_store(
    config: &ClientConfig,
    user_id: &str,
    app: &mut App,
) -> (mpsc::Sender<SyncCommand>, mpsc::Receiver<SyncEvent>) {
    match config.store_url() {
        Ok(Some(url)) => match RemoteStore::connect(url.as_str(), user_id).await {
            Ok(store) => sync::spawn_sync(store),
            Err(e) => {
                tracing::warn!(err = %e, "store connection failed, running offline");
                app.notice = Some(format!("could not reach store, running offline ({e})"));
                sync::spawn_sync(MemoryStore::new())
            }
        },
        Ok(None) => sync::spawn_sync(MemoryStore::new()),
        Err(e) => {
            app.notice = Some(format!("bad server url, running offline ({e})"));
            sync::spawn_sync(MemoryStore::new())
        }
    }
}
