use clap::Args;

use ephemera_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = 5080)]
    pub api_port: u16,

    /// Base URL share links point at (defaults to localhost on the API port)
    #[arg(long)]
    pub public_url: Option<url::Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_port: self.api_port,
            public_url: self.public_url.clone(),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        Ok(format!(
            "Initialized ephemera directory at: {}\n\
             - Database: {}\n\
             - Config: {}\n\
             - API port: {}\n\
             - Max blob size: {} bytes\n\
             - Sweep interval: {}s",
            state.app_dir.display(),
            state.db_path.display(),
            state.config_path.display(),
            state.config.api_port,
            state.config.max_blob_bytes,
            state.config.sweep_interval_secs,
        ))
    }
}
