//! # Database Handle
//!
//! Opens the shop's SQLite file, applies the embedded schema and hands out
//! repositories.
//!
//! ```text
//! DbConfig::new(path) ──► Database::new ──► WAL pool ──► migrations
//!                                               │
//!                                   ┌───────────┴───────────┐
//!                                   ▼                       ▼
//!                          db.products()              db.orders()
//! ```
//!
//! The file is opened in WAL mode so the back office can read the ledger
//! while a checkout writes its pending order.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;

/// `migrations/sqlite/*.sql`, compiled into the binary.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Where the database lives and how many connections it may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default: 5
    pub max_connections: u32,
}

impl DbConfig {
    /// A file-backed database. The file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// A private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` gets its own database, so the
    /// pool is held to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
        }
    }
}

/// The open database. Clones share one pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./kassa.db")).await?;
/// let catalog = db.products().list_in_stock_products().await?;
/// let order = db.orders().require(&order_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and brings its schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        MIGRATOR.run(&pool).await?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            migrations = MIGRATOR.migrations.len(),
            "Database ready"
        );
        Ok(Database { pool })
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Waits for open connections to finish. Repositories fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_has_empty_tables() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.products().count().await.unwrap(), 0);
        assert!(db.orders().list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopening_a_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kassa.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        crate::seed::seed_catalog(&db).await.unwrap();
        let seeded = db.products().count().await.unwrap();
        db.close().await;

        // migrations already applied: the second open must not fail or wipe
        let reopened = Database::new(DbConfig::new(&path).max_connections(2))
            .await
            .unwrap();
        assert_eq!(reopened.products().count().await.unwrap(), seeded);
        assert!(seeded > 0);
    }

    #[test]
    fn test_config_defaults() {
        let config = DbConfig::new("/tmp/kassa.db").max_connections(10);
        assert_eq!(config.max_connections, 10);
        assert_eq!(DbConfig::in_memory().max_connections, 1);
    }
}
