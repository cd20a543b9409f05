//! PostgreSQL implementation of the [`Store`] boundary.

use async_trait::async_trait;
use domain::store::{Filter, SelectQuery, Selection, Store, StoreError, Table, WriteOp, WriteOutcome};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgConnection, PgPool};
use tracing::{debug, error};

use crate::metrics::QueryTimer;
use crate::sql::{self, Bind, Statement};

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for serialization_failure.
const SERIALIZATION_FAILURE: &str = "40001";

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a driver error onto the store error kinds.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::UniqueViolation(
                db_err.constraint().unwrap_or("unique constraint").to_string(),
            ),
            Some(SERIALIZATION_FAILURE) => StoreError::Serialization(db_err.message().to_string()),
            _ => StoreError::Backend(db_err.message().to_string()),
        },
        sqlx::Error::RowNotFound => StoreError::Backend("Row not found".into()),
        _ => {
            error!(error = %err, "Database error");
            StoreError::Backend(err.to_string())
        }
    }
}

fn arguments(binds: &[Bind]) -> PgArguments {
    let mut args = PgArguments::default();
    for bind in binds {
        match bind {
            Bind::Json(value) => args.add(value.clone()),
            Bind::Text(text) => args.add(text.clone()),
            Bind::Timestamp(ts) => args.add(*ts),
            Bind::Int(n) => args.add(*n),
        }
    }
    args
}

async fn fetch_rows(conn: &mut PgConnection, stmt: &Statement) -> Result<Vec<Value>, StoreError> {
    debug!(sql = %stmt.sql, "Executing query");
    sqlx::query_scalar_with::<_, Value, _>(&stmt.sql, arguments(&stmt.binds))
        .fetch_all(conn)
        .await
        .map_err(store_error)
}

async fn fetch_optional_row(
    conn: &mut PgConnection,
    stmt: &Statement,
) -> Result<Option<Value>, StoreError> {
    debug!(sql = %stmt.sql, "Executing query");
    sqlx::query_scalar_with::<_, Value, _>(&stmt.sql, arguments(&stmt.binds))
        .fetch_optional(conn)
        .await
        .map_err(store_error)
}

async fn insert_row(conn: &mut PgConnection, table: Table, row: &Value) -> Result<Value, StoreError> {
    let stmt = sql::insert(table, row)?;
    fetch_optional_row(conn, &stmt)
        .await?
        .ok_or_else(|| StoreError::Backend(format!("Insert into {} returned no row", table)))
}

async fn update_row(
    conn: &mut PgConnection,
    table: Table,
    key: &str,
    patch: &Value,
) -> Result<Value, StoreError> {
    let stmt = sql::update(table, key, patch)?;
    fetch_optional_row(conn, &stmt)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            table,
            key: key.to_string(),
        })
}

async fn update_rows(
    conn: &mut PgConnection,
    table: Table,
    filters: &[Filter],
    patch: &Value,
) -> Result<Vec<Value>, StoreError> {
    let stmt = sql::update_where(table, filters, patch)?;
    fetch_rows(conn, &stmt).await
}

async fn apply(conn: &mut PgConnection, op: &WriteOp) -> Result<WriteOutcome, StoreError> {
    match op {
        WriteOp::Insert { table, row } => insert_row(conn, *table, row).await.map(WriteOutcome::Inserted),
        WriteOp::Update { table, key, patch } => update_row(conn, *table, key, patch)
            .await
            .map(WriteOutcome::Updated),
        WriteOp::UpdateWhere {
            table,
            filters,
            patch,
        } => update_rows(conn, *table, filters, patch)
            .await
            .map(WriteOutcome::UpdatedMany),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Selection, StoreError> {
        let timer = QueryTimer::new(format!("select_{}", table));
        let rows_stmt = sql::select(table, query)?;
        let count_stmt = sql::count(table, &query.filters)?;

        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        let rows = fetch_rows(&mut *conn, &rows_stmt).await?;
        let total = sqlx::query_scalar_with::<_, i64, _>(&count_stmt.sql, arguments(&count_stmt.binds))
            .fetch_one(&mut *conn)
            .await
            .map_err(store_error)?;
        timer.record();

        Ok(Selection { rows, total })
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<i64, StoreError> {
        let timer = QueryTimer::new(format!("count_{}", table));
        let stmt = sql::count(table, filters)?;
        let result = sqlx::query_scalar_with::<_, i64, _>(&stmt.sql, arguments(&stmt.binds))
            .fetch_one(&self.pool)
            .await
            .map_err(store_error);
        timer.record();
        result
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let timer = QueryTimer::new(format!("insert_{}", table));
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        let result = insert_row(&mut *conn, table, &row).await;
        timer.record();
        result
    }

    async fn update(&self, table: Table, key: &str, patch: Value) -> Result<Value, StoreError> {
        let timer = QueryTimer::new(format!("update_{}", table));
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        let result = update_row(&mut *conn, table, key, &patch).await;
        timer.record();
        result
    }

    async fn delete(&self, table: Table, key: &str) -> Result<(), StoreError> {
        let timer = QueryTimer::new(format!("delete_{}", table));
        let stmt = sql::delete(table, key);
        let result = sqlx::query_with(&stmt.sql, arguments(&stmt.binds))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        timer.record();

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn execute_atomic(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError> {
        let timer = QueryTimer::new("execute_atomic");
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        let mut outcomes = Vec::with_capacity(ops.len());
        for op in &ops {
            // Dropping `tx` on error rolls the batch back.
            outcomes.push(apply(&mut *tx, op).await?);
        }
        tx.commit().await.map_err(store_error)?;
        timer.record();

        Ok(outcomes)
    }
}
