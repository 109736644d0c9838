use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::DatabaseSetupError;

const MAX_CONNECTIONS: u32 = 8;

fn is_in_memory(url: &url::Url) -> bool {
    url.as_str().contains(":memory:") || url.query().unwrap_or_default().contains("mode=memory")
}

pub async fn connect_sqlite(url: &url::Url) -> Result<SqlitePool, DatabaseSetupError> {
    let in_memory = is_in_memory(url);

    let mut options = SqliteConnectOptions::from_str(url.as_str())
        .map_err(DatabaseSetupError::Unavailable)?
        .create_if_missing(true)
        .foreign_keys(true);

    // WAL keeps readers off the writer's back; it does not apply to memory databases
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // every connection to sqlite::memory: is its own database, so pin exactly one
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(DatabaseSetupError::Unavailable)
}

pub async fn migrate_sqlite(pool: &SqlitePool) -> Result<(), DatabaseSetupError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DatabaseSetupError::MigrationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_memory_urls() {
        assert!(is_in_memory(&url::Url::parse("sqlite::memory:").unwrap()));
        assert!(is_in_memory(
            &url::Url::parse("sqlite://shared?mode=memory&cache=shared").unwrap()
        ));
        assert!(!is_in_memory(
            &url::Url::parse("sqlite:///var/lib/ephemera/db.sqlite").unwrap()
        ));
    }

    #[tokio::test]
    async fn test_connect_and_migrate_memory() {
        let pool = connect_sqlite(&url::Url::parse("sqlite::memory:").unwrap())
            .await
            .unwrap();
        migrate_sqlite(&pool).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"objects"));
        assert!(names.contains(&"items"));
    }
}
