use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::distributor::DEFAULT_SUBSCRIPTION_CAPACITY;
use crate::gateway::DEFAULT_MAX_BLOB_BYTES;

pub const APP_NAME: &str = "ephemera";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Largest accepted encrypted blob, in bytes
    #[serde(default = "default_max_blob_bytes")]
    pub max_blob_bytes: usize,
    /// Seconds between purges of expired objects
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Per-object change signals buffered before a subscriber lags
    #[serde(default = "default_subscription_capacity")]
    pub subscription_capacity: usize,
    /// Times the CLI refetches and retries a write that lost a race
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Delay before the first conflict retry, doubled on each further one
    #[serde(default = "default_conflict_backoff_base_ms")]
    pub conflict_backoff_base_ms: u64,
    /// Upper bound on the conflict retry delay, before jitter
    #[serde(default = "default_conflict_backoff_max_ms")]
    pub conflict_backoff_max_ms: u64,
    /// Base URL share links point at (defaults to localhost on `api_port`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<Url>,
    /// Directory for daily log files (stdout only if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_api_port() -> u16 {
    5080
}

fn default_max_blob_bytes() -> usize {
    DEFAULT_MAX_BLOB_BYTES
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_subscription_capacity() -> usize {
    DEFAULT_SUBSCRIPTION_CAPACITY
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_conflict_backoff_base_ms() -> u64 {
    50
}

fn default_conflict_backoff_max_ms() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            max_blob_bytes: default_max_blob_bytes(),
            sweep_interval_secs: default_sweep_interval_secs(),
            subscription_capacity: default_subscription_capacity(),
            max_conflict_retries: default_max_conflict_retries(),
            conflict_backoff_base_ms: default_conflict_backoff_base_ms(),
            conflict_backoff_max_ms: default_conflict_backoff_max_ms(),
            public_url: None,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the ephemera directory (~/.ephemera)
    pub app_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the ephemera directory path (custom or default ~/.ephemera)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if app_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&app_dir)?;

        let config = config.unwrap_or_default();
        let config_path = app_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // sqlx creates and migrates the database on first start
        let db_path = app_dir.join(DB_FILE_NAME);

        Ok(Self {
            app_dir,
            db_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the ephemera directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = app_dir.join(DB_FILE_NAME);
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            app_dir,
            db_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ephemera directory not initialized. Run 'ephemera init' first")]
    NotInitialized,

    #[error("ephemera directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
