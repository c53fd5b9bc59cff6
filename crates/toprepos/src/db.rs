//! Database connection utilities.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Connection pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on open connections. Values below 1 are raised to 1.
    pub max_connections: u32,
    pub min_connections: u32,
    /// Idle connections above `min_connections` are closed after this long.
    pub idle_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl PoolOptions {
    fn connect_options(&self, database_url: &str) -> ConnectOptions {
        let mut opts = ConnectOptions::new(database_url.to_owned());

        if is_in_memory(database_url) {
            // Every pooled connection to `:memory:` would open its own empty database.
            opts.max_connections(1).min_connections(1);
        } else {
            let max = self.max_connections.max(1);
            opts.max_connections(max)
                .min_connections(self.min_connections.min(max))
                .idle_timeout(self.idle_timeout);
        }

        opts
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite:") && database_url.contains(":memory:")
}

/// Configure SQLite-specific pragmas for better performance and concurrency.
///
/// This sets:
/// - `journal_mode=WAL` - Write-ahead logging so API reads don't block the sync job
/// - `busy_timeout=5000` - Wait up to 5 seconds for locks instead of failing immediately
/// - `synchronous=NORMAL` - Good balance of safety and performance with WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::{ConnectionTrait, Statement};

    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }

    Ok(())
}

/// Open a pooled connection.
///
/// File-backed SQLite databases additionally get WAL mode, a 5 second busy
/// timeout and `synchronous=NORMAL`. `sqlite::memory:` URLs are pinned to a
/// single connection.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str, pool: &PoolOptions) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(pool.connect_options(database_url)).await?;

    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(
        max_connections = pool.max_connections,
        in_memory = is_in_memory(database_url),
        "database pool ready"
    );
    Ok(db)
}

/// Open a pooled connection and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = toprepos::connect_and_migrate("sqlite::memory:", &PoolOptions::default()).await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(
    database_url: &str,
    pool: &PoolOptions,
) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url, pool).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn configure_sqlite_runs_all_pragmas() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([
                MockExecResult {
                    rows_affected: 0,
                    last_insert_id: 0,
                },
                MockExecResult {
                    rows_affected: 0,
                    last_insert_id: 0,
                },
                MockExecResult {
                    rows_affected: 0,
                    last_insert_id: 0,
                },
            ])
            .into_connection();

        configure_sqlite(&db)
            .await
            .expect("mock sqlite pragma execs should succeed");
    }

    #[test]
    fn pool_options_clamp_and_pin_memory() {
        let pool = PoolOptions {
            max_connections: 0,
            min_connections: 3,
            idle_timeout: Duration::from_secs(10),
        };

        let opts = pool.connect_options("postgres://localhost/toprepos");
        assert_eq!(opts.get_max_connections(), Some(1));
        assert_eq!(opts.get_min_connections(), Some(1));
        assert_eq!(opts.get_idle_timeout(), Some(Duration::from_secs(10)));

        let memory = PoolOptions::default().connect_options("sqlite::memory:");
        assert_eq!(memory.get_max_connections(), Some(1));
    }

    #[test]
    fn defaults_match_documented_pool() {
        let pool = PoolOptions::default();
        assert_eq!(pool.max_connections, 5);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(pool.idle_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let err = connect("this-is-not-a-db-url", &PoolOptions::default())
            .await
            .expect_err("invalid URL should error");
        let msg = err.to_string().to_ascii_lowercase();
        assert!(
            msg.contains("error") || msg.contains("invalid"),
            "unexpected error message: {err}"
        );
    }
}
