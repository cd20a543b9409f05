//! SQL composition for [`PgStore`](crate::pg_store::PgStore).
//!
//! Rows cross the boundary as JSONB: reads use `to_jsonb(t)`, writes go
//! through `jsonb_populate_record`. Column names are only interpolated after
//! checking them against the table's column list; every value is a bind
//! parameter.

use chrono::{DateTime, Utc};
use domain::store::{Filter, SelectQuery, StoreError, Table};
use serde_json::Value;

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Json(Value),
    Text(String),
    Timestamp(DateTime<Utc>),
    Int(i64),
}

/// SQL text plus its ordered bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Bind>,
}

fn column(table: Table, name: &str) -> Result<String, StoreError> {
    if table.has_column(name) {
        Ok(format!("t.{}", name))
    } else {
        Err(StoreError::Backend(format!(
            "Unknown column {} on {}",
            name, table
        )))
    }
}

/// Escape LIKE wildcards so the term matches literally.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Builds a WHERE clause, numbering parameters from `param_idx`.
struct Conditions {
    param_idx: usize,
    conditions: Vec<String>,
    binds: Vec<Bind>,
}

impl Conditions {
    fn new(param_idx: usize) -> Self {
        Self {
            param_idx,
            conditions: Vec::new(),
            binds: Vec::new(),
        }
    }

    fn push_bind(&mut self, bind: Bind) -> usize {
        let idx = self.param_idx;
        self.binds.push(bind);
        self.param_idx += 1;
        idx
    }

    fn add(&mut self, table: Table, filter: &Filter) -> Result<(), StoreError> {
        let condition = match filter {
            Filter::Eq(name, Value::Null) => format!("{} IS NULL", column(table, name)?),
            Filter::Eq(name, value) => {
                let col = column(table, name)?;
                let idx = self.push_bind(Bind::Json(value.clone()));
                format!("to_jsonb({}) = ${}", col, idx)
            }
            Filter::ILikeAny(names, term) => {
                let cols = names
                    .iter()
                    .map(|name| column(table, name))
                    .collect::<Result<Vec<_>, _>>()?;
                let idx = self.push_bind(Bind::Text(like_pattern(term)));
                let clauses: Vec<String> = cols
                    .iter()
                    .map(|col| format!("{}::text ILIKE ${}", col, idx))
                    .collect();
                format!("({})", clauses.join(" OR "))
            }
            Filter::Gte(name, from) => {
                let col = column(table, name)?;
                let idx = self.push_bind(Bind::Timestamp(*from));
                format!("{} >= ${}", col, idx)
            }
            Filter::Contains(name, value) => {
                let col = column(table, name)?;
                let idx = self.push_bind(Bind::Json(Value::Array(vec![value.clone()])));
                format!("to_jsonb({}) @> ${}", col, idx)
            }
            Filter::In(name, values) => {
                if values.is_empty() {
                    "FALSE".to_string()
                } else {
                    let col = column(table, name)?;
                    let idx = self.push_bind(Bind::Json(Value::Array(values.clone())));
                    format!(
                        "to_jsonb({}) IN (SELECT jsonb_array_elements(${}))",
                        col, idx
                    )
                }
            }
        };
        self.conditions.push(condition);
        Ok(())
    }

    fn add_all(&mut self, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
        for filter in filters {
            self.add(table, filter)?;
        }
        Ok(())
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

pub fn select(table: Table, query: &SelectQuery) -> Result<Statement, StoreError> {
    let mut conditions = Conditions::new(1);
    conditions.add_all(table, &query.filters)?;

    let mut sql = format!(
        "SELECT to_jsonb(t) FROM {} t{}",
        table,
        conditions.where_clause()
    );
    if let Some(sort) = query.sort {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            column(table, sort.column)?,
            sort.direction.as_sql()
        ));
    }
    if let Some(limit) = query.limit {
        let idx = conditions.push_bind(Bind::Int(limit as i64));
        sql.push_str(&format!(" LIMIT ${}", idx));
    }
    if query.offset > 0 {
        let idx = conditions.push_bind(Bind::Int(query.offset as i64));
        sql.push_str(&format!(" OFFSET ${}", idx));
    }

    Ok(Statement {
        sql,
        binds: conditions.binds,
    })
}

pub fn count(table: Table, filters: &[Filter]) -> Result<Statement, StoreError> {
    let mut conditions = Conditions::new(1);
    conditions.add_all(table, filters)?;
    Ok(Statement {
        sql: format!("SELECT COUNT(*) FROM {} t{}", table, conditions.where_clause()),
        binds: conditions.binds,
    })
}

pub fn insert(table: Table, row: &Value) -> Result<Statement, StoreError> {
    patch_columns(table, row)?;
    Ok(Statement {
        sql: format!(
            "INSERT INTO {0} AS t SELECT * FROM jsonb_populate_record(NULL::{0}, $1) RETURNING to_jsonb(t)",
            table
        ),
        binds: vec![Bind::Json(row.clone())],
    })
}

fn patch_columns(table: Table, patch: &Value) -> Result<Vec<String>, StoreError> {
    let Value::Object(fields) = patch else {
        return Err(StoreError::Backend(format!(
            "Write to {} must be a JSON object",
            table
        )));
    };
    fields
        .keys()
        .map(|name| {
            column(table, name)?;
            Ok(format!("{0} = p.{0}", name))
        })
        .collect()
}

pub fn update(table: Table, key: &str, patch: &Value) -> Result<Statement, StoreError> {
    let assignments = patch_columns(table, patch)?;
    if assignments.is_empty() {
        return Ok(Statement {
            sql: format!(
                "SELECT to_jsonb(t) FROM {} t WHERE t.{}::text = $1",
                table,
                table.key_column()
            ),
            binds: vec![Bind::Text(key.to_string())],
        });
    }
    Ok(Statement {
        sql: format!(
            "UPDATE {0} AS t SET {1} FROM jsonb_populate_record(NULL::{0}, $1) AS p WHERE t.{2}::text = $2 RETURNING to_jsonb(t)",
            table,
            assignments.join(", "),
            table.key_column()
        ),
        binds: vec![Bind::Json(patch.clone()), Bind::Text(key.to_string())],
    })
}

pub fn update_where(table: Table, filters: &[Filter], patch: &Value) -> Result<Statement, StoreError> {
    let assignments = patch_columns(table, patch)?;
    if assignments.is_empty() {
        return Err(StoreError::Backend(format!(
            "Conditional update of {} has an empty patch",
            table
        )));
    }
    let mut conditions = Conditions::new(2);
    conditions.add_all(table, filters)?;

    let mut binds = vec![Bind::Json(patch.clone())];
    binds.extend(conditions.binds.iter().cloned());
    Ok(Statement {
        sql: format!(
            "UPDATE {0} AS t SET {1} FROM jsonb_populate_record(NULL::{0}, $1) AS p{2} RETURNING to_jsonb(t)",
            table,
            assignments.join(", "),
            conditions.where_clause()
        ),
        binds,
    })
}

pub fn delete(table: Table, key: &str) -> Statement {
    Statement {
        sql: format!(
            "DELETE FROM {} AS t WHERE t.{}::text = $1",
            table,
            table.key_column()
        ),
        binds: vec![Bind::Text(key.to_string())],
    }
}
