//! Data store boundary.
//!
//! The admin services read and write rows through the [`Store`] trait. Rows are
//! JSON objects keyed by column name. The store offers row-level reads and
//! writes, filter predicates, ordering and counts, plus an atomic batch of
//! writes for multi-step operations that must appear atomic to readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Tables known to the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Plans,
    PlatformModules,
    Subscriptions,
    SystemSettings,
    Orders,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Profiles,
        Table::Plans,
        Table::PlatformModules,
        Table::Subscriptions,
        Table::SystemSettings,
        Table::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Plans => "plans",
            Table::PlatformModules => "platform_modules",
            Table::Subscriptions => "subscriptions",
            Table::SystemSettings => "system_settings",
            Table::Orders => "orders",
        }
    }

    /// Primary key column.
    pub fn key_column(&self) -> &'static str {
        match self {
            Table::SystemSettings => "key",
            _ => "id",
        }
    }

    /// Columns that may appear in filters, sorts and patches.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Profiles => &[
                "id",
                "name",
                "email",
                "user_type",
                "status",
                "enabled_modules",
                "plan_id",
                "created_at",
                "updated_at",
                "last_login_at",
            ],
            Table::Plans => &[
                "id",
                "name",
                "slug",
                "price",
                "billing_cycle",
                "features",
                "modules_included",
                "max_storage_gb",
                "is_highlighted",
                "status",
                "created_at",
                "updated_at",
            ],
            Table::PlatformModules => &[
                "id",
                "name",
                "slug",
                "description",
                "icon",
                "color",
                "status",
                "sort_order",
                "created_at",
                "updated_at",
            ],
            Table::Subscriptions => &[
                "id",
                "user_id",
                "plan_id",
                "status",
                "started_at",
                "cancelled_at",
            ],
            Table::SystemSettings => &[
                "key",
                "value",
                "kind",
                "category",
                "description",
                "updated_at",
            ],
            Table::Orders => &["id", "buyer_name", "total", "created_at"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors reported by a [`Store`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{table} row {key} not found")]
    NotFound { table: Table, key: String },

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Serialization failure: {0}")]
    Serialization(String),

    #[error("Failed to decode {table} row: {message}")]
    Decode { table: Table, message: String },

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Filter predicate on a single table.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(&'static str, Value),
    /// Case-insensitive substring match OR-ed across `columns`.
    ILikeAny(&'static [&'static str], String),
    /// `column >= timestamp`
    Gte(&'static str, DateTime<Utc>),
    /// Array column contains `value`.
    Contains(&'static str, Value),
    /// `column` equals one of `values`.
    In(&'static str, Vec<Value>),
}

impl Filter {
    /// Columns referenced by the predicate.
    pub fn columns(&self) -> Vec<&'static str> {
        match self {
            Filter::Eq(column, _)
            | Filter::Gte(column, _)
            | Filter::Contains(column, _)
            | Filter::In(column, _) => vec![column],
            Filter::ILikeAny(columns, _) => columns.to_vec(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordering applied to a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// A composed read request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Rows returned by a select plus the match count ignoring limit/offset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub rows: Vec<Value>,
    pub total: i64,
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        table: Table,
        row: Value,
    },
    Update {
        table: Table,
        key: String,
        patch: Value,
    },
    /// Update every row matching all filters; matching nothing is not an error.
    UpdateWhere {
        table: Table,
        filters: Vec<Filter>,
        patch: Value,
    },
}

/// Result of one [`WriteOp`] in an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Inserted(Value),
    Updated(Value),
    UpdatedMany(Vec<Value>),
}

impl WriteOutcome {
    /// The single row produced by an insert or keyed update.
    pub fn into_row(self) -> Option<Value> {
        match self {
            WriteOutcome::Inserted(row) | WriteOutcome::Updated(row) => Some(row),
            WriteOutcome::UpdatedMany(_) => None,
        }
    }

    pub fn into_rows(self) -> Vec<Value> {
        match self {
            WriteOutcome::Inserted(row) | WriteOutcome::Updated(row) => vec![row],
            WriteOutcome::UpdatedMany(rows) => rows,
        }
    }
}

/// External data store used by every admin service.
///
/// Implementations must enforce the uniqueness constraints (plan slug, module
/// slug, setting key, one active subscription per user) and report violations
/// as [`StoreError::UniqueViolation`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Read rows matching the query, with the total match count.
    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Selection, StoreError>;

    /// Count rows matching all filters.
    async fn count(&self, table: Table, filters: &[Filter]) -> Result<i64, StoreError>;

    /// Insert a row and return it as stored.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError>;

    /// Apply a partial update to the row with the given key.
    async fn update(&self, table: Table, key: &str, patch: Value) -> Result<Value, StoreError>;

    /// Delete the row with the given key.
    async fn delete(&self, table: Table, key: &str) -> Result<(), StoreError>;

    /// Apply every write or none of them, serializably.
    async fn execute_atomic(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError>;
}

/// Decode a JSON row into a typed model.
pub fn decode_row<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode {
        table,
        message: e.to_string(),
    })
}

/// Decode a list of JSON rows into typed models.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Encode a model as a JSON row.
pub fn encode_row<T: Serialize>(table: Table, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Decode {
        table,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Profiles.as_str(), "profiles");
        assert_eq!(Table::PlatformModules.to_string(), "platform_modules");
        assert_eq!(Table::SystemSettings.key_column(), "key");
        assert_eq!(Table::Plans.key_column(), "id");
    }

    #[test]
    fn test_table_columns() {
        assert!(Table::Profiles.has_column("enabled_modules"));
        assert!(!Table::Profiles.has_column("price"));
        for table in Table::ALL {
            assert!(table.has_column(table.key_column()));
        }
    }

    #[test]
    fn test_filter_columns() {
        let filter = Filter::ILikeAny(&["name", "email"], "ann".into());
        assert_eq!(filter.columns(), vec!["name", "email"]);
        assert_eq!(Filter::Eq("status", json!("active")).columns(), vec!["status"]);
    }

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new()
            .filter(Filter::Eq("status", json!("active")))
            .sort(Sort::asc("price"))
            .limit(10)
            .offset(20);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.sort, Some(Sort::asc("price")));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, 20);
    }

    #[test]
    fn test_write_outcome_rows() {
        let row = json!({"id": "a"});
        assert_eq!(WriteOutcome::Inserted(row.clone()).into_row(), Some(row.clone()));
        assert_eq!(WriteOutcome::UpdatedMany(vec![row.clone()]).into_row(), None);
        assert_eq!(WriteOutcome::UpdatedMany(vec![row.clone()]).into_rows().len(), 1);
    }

    #[test]
    fn test_decode_row_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Named {
            name: String,
        }
        let err = decode_row::<Named>(Table::Plans, json!({"name": 5})).unwrap_err();
        assert!(matches!(err, StoreError::Decode { table: Table::Plans, .. }));
    }
}
