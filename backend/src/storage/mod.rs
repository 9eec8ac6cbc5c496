//! Persistence access layer
//!
//! [`Database`] owns the single SQLite connection every service shares. It is
//! opened explicitly with [`Database::initialize`] and closed with
//! [`Database::shutdown`]; reads and writes go through
//! [`Database::execute_with_retry`] and [`Database::execute_transaction`],
//! which retry lock/busy failures with exponential backoff.

mod decimal;
mod query;
mod retry;
mod transaction;

use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

pub use decimal::SqlDecimal;
pub use query::SqlFilter;
pub use retry::RetryPolicy;
pub use transaction::ImmediateTransaction;

/// Shared handle to the ledger database
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    config: DatabaseConfig,
    retry: RetryPolicy,
    pool: RwLock<Option<SqlitePool>>,
    /// Serialises `initialize` so concurrent callers share one attempt
    init_lock: Mutex<()>,
}

impl Database {
    pub fn new(config: DatabaseConfig, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                config,
                retry,
                pool: RwLock::new(None),
                init_lock: Mutex::new(()),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.current_pool().is_some()
    }

    fn current_pool(&self) -> Option<SqlitePool> {
        self.inner
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_pool(&self, pool: Option<SqlitePool>) {
        *self
            .inner
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner) = pool;
    }

    /// Open the connection, apply pragmas and run migrations.
    ///
    /// Idempotent. Callers arriving while another initialisation is in flight
    /// wait for it and reuse its connection.
    pub async fn initialize(&self) -> AppResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.inner.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        let pool = self.connect().await?;
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations completed");

        self.set_pool(Some(pool));
        Ok(())
    }

    async fn connect(&self) -> AppResult<SqlitePool> {
        let config = &self.inner.config;
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout());

        let attempts = config.connect_attempts.max(1);
        let mut attempt = 1;
        loop {
            info!(url = %config.url, attempt, "Connecting to database...");
            // One connection, never recycled: the ledger has a single writer,
            // and an in-memory database lives only as long as its connection.
            let result = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options.clone())
                .await;

            match result {
                Ok(pool) => {
                    info!("Database connection established");
                    return Ok(pool);
                }
                Err(err) if attempt < attempts => {
                    warn!(attempt, error = %err, "Database connection failed, retrying");
                    tokio::time::sleep(config.connect_retry_delay()).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The open pool, or `NotInitialized` before `initialize` succeeds
    pub fn connection(&self) -> AppResult<SqlitePool> {
        self.current_pool().ok_or(AppError::NotInitialized)
    }

    /// Run `operation`, retrying while it fails with lock contention
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> AppResult<T>
    where
        F: FnMut(SqlitePool) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let pool = self.connection()?;
        let policy = &self.inner.retry;
        let mut attempt = 1;
        loop {
            match op(pool.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => match policy.next_delay(attempt, &err) {
                    Some(delay) => {
                        warn!(operation, attempt, ?delay, error = %err, "Database locked, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(policy.give_up(operation, attempt, err)),
                },
            }
        }
    }

    /// Run `op` inside `BEGIN IMMEDIATE` / `COMMIT`, rolling back on error.
    ///
    /// The whole transaction is retried on lock contention, so `op` may run
    /// more than once and must rebuild its inputs on every call.
    pub async fn execute_transaction<T, F>(&self, operation: &'static str, mut op: F) -> AppResult<T>
    where
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, AppResult<T>>,
    {
        let pool = self.connection()?;
        let policy = &self.inner.retry;
        let mut attempt = 1;
        loop {
            match run_in_transaction(&pool, operation, &mut op).await {
                Ok(value) => {
                    debug!(operation, attempt, "Transaction committed");
                    return Ok(value);
                }
                Err(err) => match policy.next_delay(attempt, &err) {
                    Some(delay) => {
                        warn!(operation, attempt, ?delay, error = %err, "Transaction hit a locked database, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(policy.give_up(operation, attempt, err)),
                },
            }
        }
    }

    /// Optimise and close the connection. A later `initialize` reopens it.
    pub async fn shutdown(&self) {
        let _guard = self.inner.init_lock.lock().await;
        let Some(pool) = self.current_pool() else {
            return;
        };
        if let Err(err) = sqlx::query("PRAGMA optimize").execute(&pool).await {
            warn!(error = %err, "PRAGMA optimize failed during shutdown");
        }
        pool.close().await;
        self.set_pool(None);
        info!("Database closed");
    }
}

async fn run_in_transaction<T, F>(
    pool: &SqlitePool,
    operation: &'static str,
    op: &mut F,
) -> AppResult<T>
where
    F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, AppResult<T>>,
{
    let mut tx = ImmediateTransaction::begin(pool, operation).await?;
    let outcome = op(tx.connection()?).await;
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await;
            Err(err)
        }
    }
}
