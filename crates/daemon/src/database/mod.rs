mod record_store;
mod sqlite;
mod types;

use std::ops::Deref;
use std::sync::Arc;

use sqlx::SqlitePool;

use common::clock::{SharedClock, SystemClock};

/// SQLite-backed record store.
///
/// Derefs to the pool for ad-hoc queries; the clock decides what counts as expired.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
    clock: SharedClock,
}

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        Self::connect_with_clock(database_url, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        database_url: &url::Url,
        clock: SharedClock,
    ) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db, clock));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    pub fn new(pool: SqlitePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    /// Cheap liveness probe used by the readiness check
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),
}
