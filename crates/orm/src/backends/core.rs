//! Core Database Backend Traits
//!
//! This module defines the facade the migration engine talks to. It hides the
//! concrete driver behind a small set of operations: execute a statement,
//! fetch rows, delete by conditions, check for tables and drop them. Everything the
//! engine needs to know about the backend flows through [`SqlDialect`].

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::error::{OrmError, OrmResult};

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl DatabaseValue {
    /// Render scalar values as text; `None` for null
    pub fn as_text(&self) -> Option<String> {
        match self {
            DatabaseValue::Null => None,
            DatabaseValue::Bool(b) => Some(b.to_string()),
            DatabaseValue::Int64(i) => Some(i.to_string()),
            DatabaseValue::Float64(f) => Some(f.to_string()),
            DatabaseValue::String(s) => Some(s.clone()),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int64(value as i64)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A fetched row: column names alongside decoded values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseRow {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl DatabaseRow {
    pub fn new(columns: Vec<String>, values: Vec<DatabaseValue>) -> Self {
        Self { columns, values }
    }

    /// Get a column value by index
    pub fn get_by_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.values.get(index)
    }

    /// Get a column value by name
    pub fn get_by_name(&self, name: &str) -> Option<&DatabaseValue> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index)
    }

    /// Get a column rendered as text
    pub fn text(&self, index: usize) -> Option<String> {
        self.get_by_index(index).and_then(DatabaseValue::as_text)
    }

    /// Get column count
    pub fn column_count(&self) -> usize {
        self.values.len()
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    MySQL,
    SQLite,
    SqlServer,
    PostgreSQL,
}

impl SqlDialect {
    /// All dialects the DDL layer knows about
    pub const ALL: [SqlDialect; 4] = [
        SqlDialect::MySQL,
        SqlDialect::SQLite,
        SqlDialect::SqlServer,
        SqlDialect::PostgreSQL,
    ];

    /// Detect the dialect from a connection URL scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_lowercase();
        scheme.parse().ok()
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::MySQL => "mysql",
            SqlDialect::SQLite => "sqlite",
            SqlDialect::SqlServer => "sqlsrv",
            SqlDialect::PostgreSQL => "pgsql",
        }
    }

    /// Get the parameter placeholder style for this dialect (index is zero based)
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::SqlServer => format!("@P{}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Get the opening and closing quote characters for identifiers
    pub fn identifier_quotes(&self) -> (char, char) {
        match self {
            SqlDialect::MySQL => ('`', '`'),
            SqlDialect::SqlServer => ('[', ']'),
            SqlDialect::PostgreSQL | SqlDialect::SQLite => ('"', '"'),
        }
    }

    /// Quote an identifier, quoting each part of a dotted name separately
    pub fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.identifier_quotes();
        name.split('.')
            .map(|part| {
                let escaped = part.replace(close, &format!("{}{}", close, close));
                format!("{}{}{}", open, escaped, close)
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Wrap a timestamp column so drivers hand it back as text
    pub fn timestamp_as_text(&self, column: &str) -> String {
        match self {
            SqlDialect::MySQL => format!("CAST({} AS CHAR)", column),
            SqlDialect::SqlServer => format!("CONVERT(VARCHAR(19), {}, 120)", column),
            SqlDialect::PostgreSQL | SqlDialect::SQLite => format!("CAST({} AS VARCHAR(32))", column),
        }
    }

    /// Query returning one row when the table (first parameter) exists.
    ///
    /// Selects a constant: catalog name columns (`name`, `sql_identifier`)
    /// cannot be decoded through the `Any` driver.
    pub fn table_exists_sql(&self) -> String {
        let p = self.parameter_placeholder(0);
        match self {
            SqlDialect::SQLite => format!(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = {}",
                p
            ),
            SqlDialect::MySQL => format!(
                "SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = {}",
                p
            ),
            SqlDialect::PostgreSQL => format!(
                "SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = {}",
                p
            ),
            SqlDialect::SqlServer => format!(
                "SELECT 1 FROM sys.tables WHERE name = {}",
                p
            ),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlDialect {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "sqlite" | "sqlite3" => Ok(SqlDialect::SQLite),
            "sqlsrv" | "mssql" | "sqlserver" => Ok(SqlDialect::SqlServer),
            "pgsql" | "postgres" | "postgresql" => Ok(SqlDialect::PostgreSQL),
            other => Err(OrmError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// SQL text with its bound parameters
pub type Statement = (String, Vec<DatabaseValue>);

/// Outcome of dropping a table; a failed drop is reported, never raised
#[derive(Debug, Clone)]
pub enum DropOutcome {
    /// The table existed and was dropped
    Dropped,
    /// There was no such table
    Missing,
    /// The backend rejected the existence check or the drop
    Failed(OrmError),
}

impl DropOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, DropOutcome::Dropped)
    }
}

/// Abstract database facade used by the migration engine
#[async_trait]
pub trait DatabaseFacade: Send + Sync {
    /// Get the SQL dialect used by this backend
    fn dialect(&self) -> SqlDialect;

    /// Prefix applied to logical table names
    fn table_prefix(&self) -> &str {
        ""
    }

    /// Map a logical table name to the physical one
    fn table_name(&self, logical: &str) -> String {
        format!("{}{}", self.table_prefix(), logical)
    }

    /// Quote an identifier for this backend
    fn quote_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Execute a statement and return the affected row count
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Execute a query and return all rows
    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<DatabaseRow>>;

    /// Execute every statement in one transaction; nothing is kept if one fails
    async fn execute_in_transaction(&self, statements: &[Statement]) -> OrmResult<()>;

    /// Select a single column of `table` filtered by equality conditions
    async fn select_column(
        &self,
        table: &str,
        column: &str,
        conditions: &[(&str, DatabaseValue)],
    ) -> OrmResult<Vec<String>> {
        let (where_sql, params) = self.where_clause(conditions);
        let sql = format!(
            "SELECT {} FROM {}{}",
            self.quote_identifier(column),
            self.quote_identifier(table),
            where_sql
        );
        let rows = self.fetch_all(&sql, &params).await?;
        Ok(rows.iter().filter_map(|row| row.text(0)).collect())
    }

    /// Delete rows of `table` matching every equality condition
    async fn delete(&self, table: &str, conditions: &[(&str, DatabaseValue)]) -> OrmResult<u64> {
        let (sql, params) = self.delete_statement(table, conditions);
        self.execute(&sql, &params).await
    }

    /// Check whether a physical table exists
    async fn table_exists(&self, table: &str) -> OrmResult<bool> {
        let sql = self.dialect().table_exists_sql();
        let rows = self.fetch_all(&sql, &[DatabaseValue::from(table)]).await?;
        Ok(!rows.is_empty())
    }

    /// Drop a physical table when it exists
    async fn drop_if_exists(&self, table: &str) -> DropOutcome {
        match self.table_exists(table).await {
            Ok(false) => DropOutcome::Missing,
            Ok(true) => {
                let sql = format!("DROP TABLE {}", self.quote_identifier(table));
                match self.execute(&sql, &[]).await {
                    Ok(_) => DropOutcome::Dropped,
                    Err(e) => DropOutcome::Failed(e),
                }
            }
            Err(e) => DropOutcome::Failed(e),
        }
    }

    /// The statement [`DatabaseFacade::delete`] runs
    fn delete_statement(&self, table: &str, conditions: &[(&str, DatabaseValue)]) -> Statement {
        let (where_sql, params) = self.where_clause(conditions);
        (format!("DELETE FROM {}{}", self.quote_identifier(table), where_sql), params)
    }

    /// Build ` WHERE a = ? AND b = ?` with placeholders numbered for the dialect
    fn where_clause(&self, conditions: &[(&str, DatabaseValue)]) -> (String, Vec<DatabaseValue>) {
        if conditions.is_empty() {
            return (String::new(), Vec::new());
        }
        let dialect = self.dialect();
        let parts: Vec<String> = conditions
            .iter()
            .enumerate()
            .map(|(i, (column, _))| {
                format!(
                    "{} = {}",
                    self.quote_identifier(column),
                    dialect.parameter_placeholder(i)
                )
            })
            .collect();
        let params = conditions.iter().map(|(_, value)| value.clone()).collect();
        (format!(" WHERE {}", parts.join(" AND ")), params)
    }
}
