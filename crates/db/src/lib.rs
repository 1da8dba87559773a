//! SQLite storage handle for bookshelf.
//!
//! [`Database`] owns the connection pool for the lifetime of the process and
//! is passed explicitly to whatever needs storage. Every logical operation
//! runs inside a [`UnitOfWork`]: one pooled connection, one transaction,
//! committed explicitly or rolled back when dropped.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to open database '{url}'")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Parameters for opening a [`Database`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub max_connections: u32,
}

impl ConnectOptions {
    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Cloneable handle to the SQLite connection pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool, creating the database file if it does not exist.
    ///
    /// In-memory databases are private to a single connection, so the pool
    /// is pinned to exactly one connection that is never recycled.
    pub async fn connect(options: &ConnectOptions) -> DbResult<Self> {
        let started_at = Instant::now();

        let connect_options = SqliteConnectOptions::from_str(&options.url)
            .map_err(|source| DbError::InvalidUrl {
                url: options.url.clone(),
                source,
            })?
            .create_if_missing(true);

        let pool_options = if options.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(options.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|source| {
                tracing::error!(url = %options.url, error = %source, "database open failed");
                DbError::Connect {
                    url: options.url.clone(),
                    source,
                }
            })?;

        tracing::info!(
            url = %options.url,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "database opened"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a new unit of work on a pooled connection.
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        let tx = self.pool.begin().await?;
        tracing::trace!("unit of work started");

        Ok(UnitOfWork {
            tx,
            started_at: Instant::now(),
        })
    }

    /// Executes one or more DDL statements inside a single unit of work.
    pub async fn execute_schema(&self, sql: &str) -> DbResult<()> {
        let mut uow = self.begin().await?;
        sqlx::raw_sql(sql).execute(uow.conn()).await?;
        uow.commit().await
    }

    pub async fn table_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A transaction scoped to one logical operation.
///
/// Dropping a `UnitOfWork` without calling [`UnitOfWork::commit`] rolls the
/// transaction back; the connection goes back to the pool either way.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    started_at: Instant,
}

impl UnitOfWork {
    /// Connection to run statements on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> DbResult<()> {
        let elapsed = self.started_at.elapsed();
        self.tx.commit().await?;
        tracing::trace!(duration_us = elapsed.as_micros() as u64, "unit of work committed");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        tracing::trace!("unit of work rolled back");
        Ok(())
    }
}
