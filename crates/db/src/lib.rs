use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Error, Executor, Pool, Sqlite,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
};
use tracing::{info, warn};

pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const DEFAULT_MIN_CONNECTIONS: u32 = 1;

const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Pragmas applied to every new connection via `after_connect`.
///
/// `synchronous` must be set AFTER `mmap_size`; with mmap enabled first,
/// writes can bypass fsync and fail with SQLITE_IOERR under load.
pub async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    conn.execute("PRAGMA temp_store = 2").await?;

    #[cfg(debug_assertions)]
    conn.execute("PRAGMA mmap_size = 67108864").await?; // 64MB

    #[cfg(not(debug_assertions))]
    conn.execute("PRAGMA mmap_size = 268435456").await?; // 256MB

    conn.execute("PRAGMA synchronous = NORMAL").await?;
    conn.execute("PRAGMA cache_size = -64000").await?;
    conn.execute("PRAGMA wal_autocheckpoint = 2000").await?;

    Ok(())
}

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if needed) the database at `db_path` and apply pending
    /// migrations.
    pub async fn new(db_path: &Path, max_connections: u32) -> Result<DBService, Error> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "Failed to create database directory");
        }

        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        info!(
            path = %db_path.display(),
            max_connections,
            "Initializing SQLite connection pool"
        );

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)))
            .after_connect(|conn, _meta| {
                Box::pin(async move { apply_performance_pragmas(conn).await })
            })
            .connect_with(options)
            .await?;

        if has_pending_migrations(&pool).await {
            info!("Applying pending database migrations");
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(DBService { pool })
    }

    /// Flush the WAL into the main database file and close every connection.
    pub async fn shutdown(&self) {
        match sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            Ok(_) => info!("Final WAL checkpoint completed"),
            Err(e) => warn!(error = %e, "Final WAL checkpoint failed"),
        }
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

/// Compares the embedded migrations against `_sqlx_migrations`.
async fn has_pending_migrations(pool: &Pool<Sqlite>) -> bool {
    let migrator = sqlx::migrate!("./migrations");
    let applied: Vec<i64> = match sqlx::query_scalar::<_, i64>(
        "SELECT version FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    {
        Ok(versions) => versions,
        // Table doesn't exist yet
        Err(_) => return true,
    };

    migrator
        .iter()
        .any(|migration| !applied.contains(&migration.version))
}
