//! Scoped `BEGIN IMMEDIATE` transactions

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// An open immediate-mode transaction on a pooled connection.
///
/// Finish it with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropping it while still open detaches and closes the connection, and
/// SQLite discards the uncommitted work when the connection closes.
pub struct ImmediateTransaction {
    conn: Option<PoolConnection<Sqlite>>,
    label: &'static str,
}

impl ImmediateTransaction {
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> AppResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self {
            conn: Some(conn),
            label,
        })
    }

    pub fn connection(&mut self) -> AppResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal(format!("transaction {} already finished", self.label)))
    }

    pub async fn commit(mut self) -> AppResult<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        if let Err(err) = sqlx::query("COMMIT").execute(&mut *conn).await {
            finish_with_rollback(conn, self.label).await;
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn rollback(mut self) {
        if let Some(conn) = self.conn.take() {
            finish_with_rollback(conn, self.label).await;
        }
    }
}

async fn finish_with_rollback(mut conn: PoolConnection<Sqlite>, label: &'static str) {
    if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!(transaction = label, error = %err, "Rollback failed, discarding connection");
        drop(conn.detach());
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!(
                transaction = self.label,
                "Transaction dropped while open, discarding connection"
            );
            drop(conn.detach());
        }
    }
}
