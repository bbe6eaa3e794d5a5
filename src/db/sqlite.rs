use crate::db::schema::SQLITE_INIT;
use crate::error::VaultError;
use crate::sql::binder::Params;
use crate::sql::exec;
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::str::FromStr;
use tracing::{debug, error, info};

pub type SqlitePool = Pool<Sqlite>;

/// Process-wide handle on the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, VaultError> {
        let connect_opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(connect_opts)
            .await?;
        let db = Self::new(pool);
        db.init_schema().await?;
        info!(url, "database ready");
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), VaultError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn query<T, F>(&self, sql: &str, params: Params, mapper: F) -> Result<Vec<T>, VaultError>
    where
        F: FnMut(&SqliteRow) -> Result<T, VaultError>,
    {
        exec::query(&self.pool, sql, params, mapper).await
    }

    pub async fn single_row<T, F>(&self, sql: &str, params: Params, mapper: F) -> Result<T, VaultError>
    where
        F: FnOnce(&SqliteRow) -> Result<T, VaultError>,
    {
        exec::single_row(&self.pool, sql, params, mapper).await
    }

    pub async fn optional_row<T, F>(
        &self,
        sql: &str,
        params: Params,
        mapper: F,
    ) -> Result<Option<T>, VaultError>
    where
        F: FnOnce(&SqliteRow) -> Result<T, VaultError>,
    {
        exec::optional_row(&self.pool, sql, params, mapper).await
    }

    pub async fn save_or_update(&self, sql: &str, params: Params) -> Result<u64, VaultError> {
        exec::save_or_update(&self.pool, sql, params).await
    }

    /// Run `block` inside one transaction on one pooled connection.
    ///
    /// The transaction starts with `BEGIN IMMEDIATE`, so the write lock is
    /// taken up front and waits on the busy timeout instead of failing on a
    /// read-to-write upgrade.
    ///
    /// Commits when the block succeeds and rolls back when it fails. A failed
    /// rollback is logged and the block's own error is returned. A failed
    /// commit is returned; the consumed transaction rolls back when released,
    /// as does a transaction whose future is dropped midway.
    pub async fn perform_transaction<T, F>(&self, block: F) -> Result<T, VaultError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, VaultError>>,
    {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let outcome = block(&mut *tx).await;
        match outcome {
            Ok(value) => {
                if let Err(e) = tx.commit().await {
                    error!(error = %e, "transaction commit failed");
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, cause = %err, "transaction rollback failed");
                }
                debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}
