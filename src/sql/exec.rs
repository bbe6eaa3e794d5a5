//! Execution helpers generic over any SQLite executor: the pool itself, or a
//! connection borrowed inside a transaction.

use crate::error::VaultError;
use crate::sql::binder::{Params, Prepared};
use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Sqlite};

/// Run a query and map every row, in result-set order.
pub async fn query<'c, E, T, F>(
    executor: E,
    sql: &str,
    params: Params,
    mut mapper: F,
) -> Result<Vec<T>, VaultError>
where
    E: Executor<'c, Database = Sqlite>,
    F: FnMut(&SqliteRow) -> Result<T, VaultError>,
{
    let prepared = Prepared::new(sql, params)?;
    let rows = prepared.query().fetch_all(executor).await?;
    rows.iter().map(&mut mapper).collect()
}

/// Run a query that must yield exactly one row.
pub async fn single_row<'c, E, T, F>(
    executor: E,
    sql: &str,
    params: Params,
    mapper: F,
) -> Result<T, VaultError>
where
    E: Executor<'c, Database = Sqlite>,
    F: FnOnce(&SqliteRow) -> Result<T, VaultError>,
{
    let prepared = Prepared::new(sql, params)?;
    let mut rows = prepared.query().fetch(executor);
    let first = rows.try_next().await?.ok_or(VaultError::EmptyResultSet)?;
    if rows.try_next().await?.is_some() {
        return Err(VaultError::MoreThanOneRow);
    }
    drop(rows);
    mapper(&first)
}

/// Zero-or-one lookup; more than one row is still a cardinality violation.
pub async fn optional_row<'c, E, T, F>(
    executor: E,
    sql: &str,
    params: Params,
    mapper: F,
) -> Result<Option<T>, VaultError>
where
    E: Executor<'c, Database = Sqlite>,
    F: FnOnce(&SqliteRow) -> Result<T, VaultError>,
{
    match single_row(executor, sql, params, mapper).await {
        Ok(value) => Ok(Some(value)),
        Err(VaultError::EmptyResultSet) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Execute an insert/update/delete and return the affected row count.
pub async fn save_or_update<'c, E>(executor: E, sql: &str, params: Params) -> Result<u64, VaultError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let prepared = Prepared::new(sql, params)?;
    let result = prepared.query().execute(executor).await?;
    Ok(result.rows_affected())
}
