//! In-process implementation of the [`Store`] boundary.
//!
//! Keeps rows as JSON objects in insertion order and enforces the same
//! uniqueness constraints as the database schema. Atomic batches are applied
//! to a copy of the tables that replaces the live state only on success.
//! Failures can be injected per table, operation and key for tests.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::store::{
    encode_row, Filter, SelectQuery, Selection, SortDirection, Store, StoreError, Table, WriteOp,
    WriteOutcome,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

type Tables = HashMap<Table, Vec<Value>>;

/// Store operation kinds, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

/// An injected failure: any matching call returns a backend error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRule {
    pub table: Table,
    pub op: Option<StoreOp>,
    pub key: Option<String>,
}

impl FailureRule {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            op: None,
            key: None,
        }
    }

    pub fn op(mut self, op: StoreOp) -> Self {
        self.op = Some(op);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn matches(&self, table: Table, op: StoreOp, key: Option<&str>) -> bool {
        self.table == table
            && self.op.map_or(true, |o| o == op)
            && self.key.as_deref().map_or(true, |k| Some(k) == key)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failures: Mutex<Vec<FailureRule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert typed rows, bypassing failure rules.
    pub async fn seed<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let mut next = tables.get(&table).cloned().unwrap_or_default();
        for row in rows {
            next.push(encode_row(table, row)?);
        }
        check_constraints(table, &next)?;
        tables.insert(table, next);
        Ok(())
    }

    /// Every row of a table in insertion order.
    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    pub fn fail_on(&self, rule: FailureRule) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(rule);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn check_failure(&self, table: Table, op: StoreOp, key: Option<&str>) -> Result<(), StoreError> {
        let failures = match self.failures.lock() {
            Ok(failures) => failures,
            Err(_) => return Err(StoreError::Backend("failure registry poisoned".into())),
        };
        if failures.iter().any(|rule| rule.matches(table, op, key)) {
            debug!(%table, ?op, ?key, "Injected store failure");
            return Err(StoreError::Backend(format!(
                "injected failure on {:?} {}",
                op, table
            )));
        }
        Ok(())
    }

    fn apply(&self, tables: &mut Tables, op: &WriteOp) -> Result<WriteOutcome, StoreError> {
        match op {
            WriteOp::Insert { table, row } => {
                self.check_failure(*table, StoreOp::Insert, None)?;
                insert_into(tables, *table, row.clone()).map(WriteOutcome::Inserted)
            }
            WriteOp::Update { table, key, patch } => {
                self.check_failure(*table, StoreOp::Update, Some(key))?;
                update_in(tables, *table, key, patch).map(WriteOutcome::Updated)
            }
            WriteOp::UpdateWhere {
                table,
                filters,
                patch,
            } => {
                self.check_failure(*table, StoreOp::Update, None)?;
                update_matching(tables, *table, filters, patch).map(WriteOutcome::UpdatedMany)
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Selection, StoreError> {
        self.check_failure(table, StoreOp::Select, None)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let total = rows.len() as i64;

        if let Some(sort) = query.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_values(&a[sort.column], &b[sort.column]);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = query.offset as usize;
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .collect();
        Ok(Selection { rows, total })
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<i64, StoreError> {
        self.check_failure(table, StoreOp::Count, None)?;
        let tables = self.tables.read().await;
        let count = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|row| matches_all(row, filters)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.check_failure(table, StoreOp::Insert, None)?;
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let stored = insert_into(&mut next, table, row)?;
        *tables = next;
        Ok(stored)
    }

    async fn update(&self, table: Table, key: &str, patch: Value) -> Result<Value, StoreError> {
        self.check_failure(table, StoreOp::Update, Some(key))?;
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let stored = update_in(&mut next, table, key, &patch)?;
        *tables = next;
        Ok(stored)
    }

    async fn delete(&self, table: Table, key: &str) -> Result<(), StoreError> {
        self.check_failure(table, StoreOp::Delete, Some(key))?;
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        delete_from(&mut next, table, key)?;
        *tables = next;
        Ok(())
    }

    async fn execute_atomic(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in &ops {
            outcomes.push(self.apply(&mut next, op)?);
        }
        *tables = next;
        Ok(outcomes)
    }
}

// ============================================================================
// Row operations
// ============================================================================

fn has_key(table: Table, row: &Value, key: &str) -> bool {
    row[table.key_column()].as_str() == Some(key)
}

fn insert_into(tables: &mut Tables, table: Table, row: Value) -> Result<Value, StoreError> {
    if !row.is_object() {
        return Err(StoreError::Backend(format!(
            "Write to {} must be a JSON object",
            table
        )));
    }
    let rows = tables.entry(table).or_default();
    rows.push(row.clone());
    check_constraints(table, rows)?;
    Ok(row)
}

/// Removes a row and applies the schema's foreign key actions: deleting a
/// profile cascades to its subscriptions, deleting a plan clears
/// `profiles.plan_id`.
fn delete_from(tables: &mut Tables, table: Table, key: &str) -> Result<(), StoreError> {
    let rows = tables.entry(table).or_default();
    let before = rows.len();
    rows.retain(|row| !has_key(table, row, key));
    if rows.len() == before {
        return Err(StoreError::NotFound {
            table,
            key: key.to_string(),
        });
    }

    match table {
        Table::Profiles => {
            let subscriptions = tables.entry(Table::Subscriptions).or_default();
            let removed = subscriptions.len();
            subscriptions.retain(|row| row["user_id"].as_str() != Some(key));
            debug!(user_id = key, removed = removed - subscriptions.len(), "Cascaded profile delete");
        }
        Table::Plans => {
            let profiles = tables.entry(Table::Profiles).or_default();
            for row in profiles.iter_mut().filter(|row| row["plan_id"].as_str() == Some(key)) {
                row["plan_id"] = Value::Null;
            }
        }
        _ => {}
    }
    Ok(())
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Value::Object(row), Value::Object(patch)) = (row, patch) {
        for (column, value) in patch {
            row.insert(column.clone(), value.clone());
        }
    }
}

fn update_in(tables: &mut Tables, table: Table, key: &str, patch: &Value) -> Result<Value, StoreError> {
    let rows = tables.entry(table).or_default();
    let row = rows
        .iter_mut()
        .find(|row| has_key(table, row, key))
        .ok_or_else(|| StoreError::NotFound {
            table,
            key: key.to_string(),
        })?;
    merge(row, patch);
    let updated = row.clone();
    check_constraints(table, rows)?;
    Ok(updated)
}

fn update_matching(
    tables: &mut Tables,
    table: Table,
    filters: &[Filter],
    patch: &Value,
) -> Result<Vec<Value>, StoreError> {
    let rows = tables.entry(table).or_default();
    let mut updated = Vec::new();
    for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
        merge(row, patch);
        updated.push(row.clone());
    }
    check_constraints(table, rows)?;
    Ok(updated)
}

/// Mirrors the unique indexes of the SQL schema.
fn check_constraints(table: Table, rows: &[Value]) -> Result<(), StoreError> {
    if !is_unique(rows, table.key_column(), |_| true) {
        return Err(StoreError::UniqueViolation(format!("{}_pkey", table)));
    }
    let unique = match table {
        Table::Plans | Table::PlatformModules => is_unique(rows, "slug", |_| true),
        Table::Subscriptions => is_unique(rows, "user_id", |row| row["status"] == "active"),
        _ => true,
    };
    if !unique {
        let constraint = match table {
            Table::Subscriptions => "subscriptions_one_active_per_user".to_string(),
            _ => format!("{}_slug_key", table),
        };
        return Err(StoreError::UniqueViolation(constraint));
    }
    Ok(())
}

fn is_unique(rows: &[Value], column: &str, applies: impl Fn(&Value) -> bool) -> bool {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| applies(*row))
        .map(|row| &row[column])
        .filter(|value| !value.is_null())
        .all(|value| seen.insert(value.to_string()))
}

// ============================================================================
// Filtering and ordering
// ============================================================================

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(row, filter))
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, Value::Null) => row[*column].is_null(),
        Filter::Eq(column, value) => values_equal(&row[*column], value),
        Filter::ILikeAny(columns, term) => {
            let term = term.to_lowercase();
            columns.iter().any(|column| {
                row[*column]
                    .as_str()
                    .map_or(false, |text| text.to_lowercase().contains(&term))
            })
        }
        Filter::Gte(column, from) => timestamp(&row[*column]).map_or(false, |at| at >= *from),
        Filter::Contains(column, value) => row[*column]
            .as_array()
            .map_or(false, |items| items.iter().any(|item| values_equal(item, value))),
        Filter::In(column, values) => values.iter().any(|value| values_equal(&row[*column], value)),
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => match (timestamp(a), timestamp(b)) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Total order used for sorting; nulls sort after every value, as in SQL.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => match (timestamp(a), timestamp(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
