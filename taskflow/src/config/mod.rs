//! Configuration system for the `TaskFlow` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskflow/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The configured server URL is not a valid ws:// or wss:// URL.
    #[error("invalid server url {url:?}: {reason}")]
    InvalidServerUrl {
        /// The offending value.
        url: String,
        /// Why it was refused.
        reason: String,
    },

    /// Could not determine the user's config directory.
    #[error("could not determine config directory (no HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    ui: UiFileConfig,
    auth: AuthFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    server_url: Option<String>,
    seed_defaults: Option<bool>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    theme: Option<String>,
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
}

/// `[auth]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    accounts_file: Option<PathBuf>,
    email: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Store --
    /// Document store WebSocket URL. `None` runs against the in-process
    /// store (offline mode).
    pub server_url: Option<String>,
    /// Whether a first empty snapshot seeds the default checklist.
    pub seed_defaults: bool,

    // -- UI --
    /// Color theme name (`dark` or `light`).
    pub theme: String,
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,

    // -- Auth --
    /// Accounts file path; `None` uses the default under the config dir.
    pub accounts_file: Option<PathBuf>,
    /// Email prefilled into the sign-in form.
    pub email: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            seed_defaults: true,
            theme: "dark".to_string(),
            poll_timeout: Duration::from_millis(50),
            timestamp_format: "%H:%M".to_string(),
            accounts_file: None,
            email: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let server_url = if cli.offline {
            None
        } else {
            cli.server_url
                .clone()
                .or_else(|| file.store.server_url.clone())
        };

        Self {
            server_url,
            seed_defaults: file.store.seed_defaults.unwrap_or(defaults.seed_defaults),
            theme: cli
                .theme
                .clone()
                .or_else(|| file.ui.theme.clone())
                .unwrap_or(defaults.theme),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format: file
                .ui
                .timestamp_format
                .clone()
                .unwrap_or(defaults.timestamp_format),
            accounts_file: file.auth.accounts_file.clone(),
            email: cli.email.clone().or_else(|| file.auth.email.clone()),
        }
    }

    /// The validated store URL, or `None` for offline mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] when the configured value
    /// does not parse or uses a scheme other than `ws` or `wss`.
    pub fn store_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(ref raw) = self.server_url else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidServerUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::InvalidServerUrl {
                url: raw.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        Ok(Some(url))
    }

    /// Path of the accounts file, defaulting to
    /// `~/.config/taskflow/accounts.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no explicit path is set and
    /// the config directory cannot be determined.
    pub fn accounts_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.accounts_file {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("taskflow").join("accounts.json"))
            .ok_or(ConfigError::NoConfigDir)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal-native sequential checklist")]
pub struct CliArgs {
    /// WebSocket URL of the document store server.
    #[arg(long, env = "TASKFLOW_SERVER_URL")]
    pub server_url: Option<String>,

    /// Run against the in-process store, ignoring any configured server.
    #[arg(long)]
    pub offline: bool,

    /// Color theme (dark, light).
    #[arg(long)]
    pub theme: Option<String>,

    /// Email prefilled into the sign-in form.
    #[arg(long, env = "TASKFLOW_EMAIL")]
    pub email: Option<String>,

    /// Path to config file (default: `~/.config/taskflow/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKFLOW_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskflow.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskflow").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
