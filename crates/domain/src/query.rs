//! Listing query builder.
//!
//! Composes filter, sort and pagination predicates into a [`SelectQuery`].
//! Empty or "all" filter values are dropped instead of being sent as
//! constraints nothing can satisfy.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::pagination::PageRequest;
use shared::validation::normalize_filter;

use crate::error::{AdminError, AdminResult};
use crate::store::{decode_rows, Filter, SelectQuery, Sort, Store, Table};

/// Default ordering for listings: newest first.
pub const DEFAULT_SORT_COLUMN: &str = "created_at";

/// A paginated, filtered listing over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    table: Table,
    filters: Vec<Filter>,
    sort: Sort,
    page: PageRequest,
}

impl ListQuery {
    /// Start a listing sorted by creation time descending.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            sort: Sort::desc(DEFAULT_SORT_COLUMN),
            page: PageRequest::default(),
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    /// Equality filter on a string value; skipped when blank or "all".
    pub fn eq_str(mut self, column: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = normalize_filter(value) {
            self.filters.push(Filter::Eq(column, Value::String(value.to_string())));
        }
        self
    }

    /// Equality filter on an arbitrary JSON value; skipped when `None` or null.
    pub fn eq(mut self, column: &'static str, value: Option<Value>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            self.filters.push(Filter::Eq(column, value));
        }
        self
    }

    /// Case-insensitive substring search OR-ed across `columns`.
    pub fn search(mut self, columns: &'static [&'static str], term: Option<&str>) -> Self {
        let term = term.map(str::trim).filter(|t| !t.is_empty());
        if let Some(term) = term {
            self.filters.push(Filter::ILikeAny(columns, term.to_string()));
        }
        self
    }

    /// Lower bound on a timestamp column.
    pub fn since(mut self, column: &'static str, from: Option<DateTime<Utc>>) -> Self {
        if let Some(from) = from {
            self.filters.push(Filter::Gte(column, from));
        }
        self
    }

    pub fn order_by(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Check every referenced column exists on the table.
    pub fn validate(&self) -> AdminResult<()> {
        let unknown = self
            .filters
            .iter()
            .flat_map(Filter::columns)
            .chain(std::iter::once(self.sort.column))
            .find(|column| !self.table.has_column(column));

        match unknown {
            Some(column) => Err(AdminError::Validation(format!(
                "Unknown column {} on {}",
                column, self.table
            ))),
            None => Ok(()),
        }
    }

    /// The store request for this listing.
    pub fn to_select(&self) -> SelectQuery {
        SelectQuery {
            filters: self.filters.clone(),
            sort: Some(self.sort),
            limit: Some(self.page.limit()),
            offset: self.page.offset(),
        }
    }

    /// Run the listing and decode rows into `T`.
    ///
    /// Returns the page of rows and the total match count independent of
    /// page size.
    pub async fn fetch<T: DeserializeOwned>(&self, store: &dyn Store) -> AdminResult<(Vec<T>, i64)> {
        self.validate()?;
        let selection = store.select(self.table, &self.to_select()).await?;
        let rows = decode_rows(self.table, selection.rows)?;
        Ok((rows, selection.total))
    }
}
