//! SQLite persistence for the reward engine.
//!
//! Every table the engine touches lives in one SQLite database. Mutating
//! operations run inside `BEGIN IMMEDIATE` transactions (see [`begin_immediate`]),
//! which take the write lock up front and serialize concurrent writers. A
//! transaction that is dropped before [`finish`] rolls back, so an abandoned
//! request never leaves the write lock held.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteTransactionManager,
};
use sqlx::{Connection, Sqlite, SqlitePool, Transaction, TransactionManager};
use tracing::{debug, info, warn};

pub mod schema;
pub mod sqlite;

/// Path value selecting a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// SQLite reported BUSY or LOCKED; the write lock could not be taken in time.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::PoolTimedOut = err {
            return StorageError::Busy("timed out acquiring a connection".to_string());
        }
        if let Some(db_err) = err.as_database_error() {
            // Extended result codes keep the primary code in the low byte.
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                return StorageError::Busy(db_err.message().to_string());
            }
        }
        StorageError::Database(err)
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path, or `:memory:` for a private in-memory database.
    pub path: String,
    /// Maximum pooled connections. Forced to 1 for in-memory databases.
    pub max_connections: u32,
    /// How long a writer waits for the SQLite write lock before giving up.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/expo-rewards.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    /// Config for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            ..Self::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.path.is_empty() || self.path == IN_MEMORY_PATH
    }
}

/// Open the connection pool described by `config` and create the schema.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    info!(path = %config.path, "opening reward store");

    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

    let pool = if config.is_in_memory() {
        // Every in-memory connection is a separate database, so pin the pool
        // to one connection that is never recycled.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.busy_timeout(busy_timeout);
        pool_options()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);
        pool_options()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?
    };

    init(&pool).await?;
    Ok(pool)
}

/// Create every table and index if missing.
pub async fn init(pool: &SqlitePool) -> Result<()> {
    for statement in schema::CREATE_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Pool options shared by file and in-memory pools.
///
/// A connection can come back while still inside a transaction when a
/// caller is cancelled between `BEGIN` completing and the [`Transaction`]
/// guard existing. Such connections are rolled back before reuse.
fn pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new().after_release(|conn, _meta| {
        Box::pin(async move {
            if conn.is_in_transaction() {
                debug!("rolling back transaction left open on released connection");
                SqliteTransactionManager::rollback(conn).await?;
            }
            Ok(true)
        })
    })
}

/// Start a transaction holding the SQLite write lock.
///
/// A second writer blocks here (up to the busy timeout) instead of failing
/// later on a read-to-write lock upgrade.
pub async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Commit on `Ok`, roll back on `Err`, and hand the result back.
pub async fn finish<T, E>(
    tx: Transaction<'static, Sqlite>,
    result: std::result::Result<T, E>,
) -> std::result::Result<T, E>
where
    E: From<StorageError>,
{
    match result {
        Ok(value) => {
            tx.commit().await.map_err(StorageError::from)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Current time as an RFC3339 string, the format every timestamp column uses.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
