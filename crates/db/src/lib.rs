use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Error, Executor, Pool, Sqlite,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
};
use tracing::info;

pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Minimum idle connections to maintain.
const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Connection acquisition and busy-handler timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Apply performance pragmas on every new connection via `after_connect`.
///
/// `synchronous` must be set AFTER `mmap_size`: enabling mmap can affect how
/// SQLite handles fsync, and without an explicit synchronous setting disk
/// I/O errors can occur under heavy write load.
async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    conn.execute("PRAGMA temp_store = 2").await?;
    conn.execute("PRAGMA mmap_size = 67108864").await?; // 64MB
    conn.execute("PRAGMA synchronous = NORMAL").await?;
    conn.execute("PRAGMA cache_size = -64000").await?; // 64MB, negative = KB
    conn.execute("PRAGMA foreign_keys = ON").await?;
    Ok(())
}

/// Owned handle to the record store.
///
/// Constructed once at startup and passed explicitly to every component that
/// reads or writes records; there is no ambient/global pool.
#[derive(Clone)]
pub struct DbService {
    pub pool: Pool<Sqlite>,
}

impl DbService {
    /// Open (creating if missing) the database at `db_path`, apply pragmas
    /// and run any pending migrations.
    pub async fn new(db_path: &Path) -> Result<DbService, Error> {
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        info!(
            path = %db_path.display(),
            max_connections = DEFAULT_MAX_CONNECTIONS,
            "initializing SQLite connection pool"
        );

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move { apply_performance_pragmas(conn).await })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(DbService { pool })
    }
}
