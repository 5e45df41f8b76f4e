//! sqlx `Any` Backend Implementation
//!
//! One facade over the PostgreSQL, MySQL and SQLite drivers, selected by the
//! connection URL scheme. SQL Server has DDL support only; connecting to it is
//! rejected with [`OrmError::UnsupportedDialect`].

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row};
use tracing::debug;

use super::core::*;
use crate::error::{OrmError, OrmResult};

/// Database facade backed by a sqlx `AnyPool`
#[derive(Debug, Clone)]
pub struct AnyDatabase {
    pool: AnyPool,
    dialect: SqlDialect,
    prefix: String,
}

impl AnyDatabase {
    /// Connect to `url`; the scheme picks the driver and dialect
    pub async fn connect(url: &str) -> OrmResult<Self> {
        Self::connect_with_prefix(url, "").await
    }

    /// Connect and apply `prefix` to every logical table name
    pub async fn connect_with_prefix(url: &str, prefix: &str) -> OrmResult<Self> {
        let dialect = SqlDialect::from_url(url)
            .ok_or_else(|| OrmError::Connection(format!("Unable to detect database backend from URL: {}", url)))?;
        if dialect == SqlDialect::SqlServer {
            return Err(OrmError::UnsupportedDialect(
                "no runtime driver is available for SQL Server".to_string(),
            ));
        }

        install_default_drivers();

        let mut options = AnyPoolOptions::new();
        if is_sqlite_memory(url) {
            // Every connection to :memory: is a separate database.
            options = options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        debug!("connecting to {} database", dialect);
        let pool = options
            .connect(url)
            .await
            .map_err(|e| OrmError::Connection(format!("Failed to connect to {} database: {}", dialect, e)))?;

        Ok(Self {
            pool,
            dialect,
            prefix: prefix.to_string(),
        })
    }

}

#[async_trait]
impl DatabaseFacade for AnyDatabase {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn table_prefix(&self) -> &str {
        &self.prefix
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let result = bind_all(sqlx::query(sql), params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<DatabaseRow>> {
        let rows = bind_all(sqlx::query(sql), params).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn execute_in_transaction(&self, statements: &[Statement]) -> OrmResult<()> {
        // Dropping the transaction on an early return rolls it back.
        let mut transaction = self.pool.begin().await?;
        for (sql, params) in statements {
            bind_all(sqlx::query(sql), params)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }
}

fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[DatabaseValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            DatabaseValue::Null => query.bind(Option::<String>::None),
            DatabaseValue::Bool(b) => query.bind(*b),
            DatabaseValue::Int64(i) => query.bind(*i),
            DatabaseValue::Float64(f) => query.bind(*f),
            DatabaseValue::String(s) => query.bind(s.clone()),
        };
    }
    query
}

fn convert_row(row: &AnyRow) -> DatabaseRow {
    let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len()).map(|index| decode_value(row, index)).collect();
    DatabaseRow::new(columns, values)
}

// Any rows carry no public type tag, so try the supported kinds in turn.
fn decode_value(row: &AnyRow, index: usize) -> DatabaseValue {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.into();
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.into();
    }
    DatabaseValue::Null
}
