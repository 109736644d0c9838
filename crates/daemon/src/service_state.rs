use url::Url;

use crate::database::{Database, DatabaseSetupError};
use crate::distributor::ChangeDistributor;
use crate::gateway::Gateway;
use crate::service_config::Config;

/// Main service state, shared by every request handler and background task
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    gateway: Gateway<Database>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        return Err(StateSetupError::DatabasePathDoesNotExist);
                    }
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!(url = %sqlite_database_url, "connecting record store");
        let database = Database::connect(&sqlite_database_url).await?;

        Ok(Self::with_database(
            database,
            ChangeDistributor::new(config.subscription_capacity),
            config.max_blob_bytes,
        ))
    }

    /// Assemble state around an already connected database
    pub fn with_database(
        database: Database,
        distributor: ChangeDistributor,
        max_blob_bytes: usize,
    ) -> Self {
        let gateway = Gateway::new(database.clone(), distributor, max_blob_bytes);
        Self { database, gateway }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn gateway(&self) -> &Gateway<Database> {
        &self.gateway
    }

    pub fn distributor(&self) -> &ChangeDistributor {
        self.gateway.distributor()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to setup the database: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("database directory does not exist")]
    DatabasePathDoesNotExist,
    #[error("invalid database url")]
    InvalidDatabaseUrl,
}
