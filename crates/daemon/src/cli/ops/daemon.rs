use clap::Args;

use ephemera_daemon::state::{AppState, StateError};
use ephemera_daemon::{spawn_service, ServiceConfig, ServiceError};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    pub ephemeral: bool,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Default log level, overridable with RUST_LOG
    #[arg(long, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    #[error("daemon failed: {0}")]
    Failed(#[from] ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // an ephemeral daemon needs no state directory
        let mut config = match AppState::load(ctx.config_path.clone()) {
            Ok(state) => ServiceConfig::from_app_state(&state, self.ephemeral),
            Err(StateError::NotInitialized) if self.ephemeral => ServiceConfig::default(),
            Err(e) => return Err(e.into()),
        };

        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if self.log_dir.is_some() {
            config.log_dir = self.log_dir.clone();
        }
        config.log_level = self.log_level;

        spawn_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
