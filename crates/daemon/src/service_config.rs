use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::distributor::DEFAULT_SUBSCRIPTION_CAPACITY;
use crate::gateway::DEFAULT_MAX_BLOB_BYTES;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,
    /// Base URL share links are built against
    pub public_url: Option<Url>,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// Largest accepted encrypted blob
    pub max_blob_bytes: usize,
    /// How often expired objects are purged
    pub sweep_interval: Duration,

    // live updates
    pub subscription_capacity: usize,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Service config from an on-disk state directory.
    ///
    /// `ephemeral` swaps the on-disk database for an in-memory one.
    pub fn from_app_state(state: &AppState, ephemeral: bool) -> Self {
        let app = &state.config;
        Self {
            api_port: app.api_port,
            public_url: app.public_url.clone(),
            sqlite_path: (!ephemeral).then(|| state.db_path.clone()),
            max_blob_bytes: app.max_blob_bytes,
            sweep_interval: Duration::from_secs(app.sweep_interval_secs.max(1)),
            subscription_capacity: app.subscription_capacity,
            log_level: tracing::Level::INFO,
            log_dir: app.log_dir.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: 5080,
            public_url: None,
            sqlite_path: None,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
            sweep_interval: Duration::from_secs(60),
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
