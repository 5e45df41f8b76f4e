//! Schema Builder - bootstrap DDL for the migrations tracking table
//!
//! Produces one create-if-absent statement per dialect. Nothing here touches
//! the database; the store decides whether and when to execute the result.

use crate::backends::SqlDialect;

/// Builder for the tracking table statement
pub struct TrackingTableDdl;

impl TrackingTableDdl {
    /// Statement creating `table` when it does not exist yet
    pub fn build(dialect: SqlDialect, table: &str) -> String {
        let q = |name: &str| dialect.quote_identifier(name);
        let columns = format!(
            "{migration} VARCHAR(255) NOT NULL, \
             {action} VARCHAR(20) NOT NULL, \
             {created_at} {timestamp} DEFAULT CURRENT_TIMESTAMP",
            migration = q("migration"),
            action = q("action"),
            created_at = q("created_at"),
            timestamp = timestamp_type(dialect),
        );
        let unique = format!("UNIQUE ({}, {})", q("migration"), q("action"));

        match dialect {
            SqlDialect::MySQL => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 {id} INT NOT NULL AUTO_INCREMENT, \
                 {columns}, \
                 PRIMARY KEY ({id}), \
                 {unique}) \
                 ENGINE=InnoDB DEFAULT CHARACTER SET=utf8mb4",
                table = q(table),
                id = q("id"),
            ),
            SqlDialect::SQLite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 {id} INTEGER PRIMARY KEY AUTOINCREMENT, \
                 {columns}, \
                 {unique})",
                table = q(table),
                id = q("id"),
            ),
            SqlDialect::SqlServer => format!(
                "IF OBJECT_ID(N'{object}', N'U') IS NULL CREATE TABLE {table} (\
                 {id} INT IDENTITY(1,1) NOT NULL, \
                 {columns}, \
                 PRIMARY KEY ({id}), \
                 {unique})",
                object = table.replace('\'', "''"),
                table = q(table),
                id = q("id"),
            ),
            SqlDialect::PostgreSQL => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 {id} SERIAL, \
                 {columns}, \
                 PRIMARY KEY ({id}), \
                 {unique})",
                table = q(table),
                id = q("id"),
            ),
        }
    }

    /// Like [`TrackingTableDdl::build`] for a backend given by name; unknown names give `""`
    pub fn for_name(backend: &str, table: &str) -> String {
        match backend.parse::<SqlDialect>() {
            Ok(dialect) => Self::build(dialect, table),
            Err(_) => String::new(),
        }
    }
}

fn timestamp_type(dialect: SqlDialect) -> &'static str {
    match dialect {
        SqlDialect::SqlServer => "DATETIME",
        _ => "TIMESTAMP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dialect_has_unique_pair() {
        for dialect in SqlDialect::ALL {
            let sql = TrackingTableDdl::build(dialect, "migrations");
            let unique = format!(
                "UNIQUE ({}, {})",
                dialect.quote_identifier("migration"),
                dialect.quote_identifier("action")
            );
            assert!(sql.contains(&unique), "{}: {}", dialect, sql);
            assert!(sql.contains("VARCHAR(255) NOT NULL"), "{}", dialect);
            assert!(sql.contains("VARCHAR(20) NOT NULL"), "{}", dialect);
            assert!(sql.contains("DEFAULT CURRENT_TIMESTAMP"), "{}", dialect);
        }
    }

    #[test]
    fn test_dialect_specific_idioms() {
        let mysql = TrackingTableDdl::build(SqlDialect::MySQL, "migrations");
        assert!(mysql.starts_with("CREATE TABLE IF NOT EXISTS `migrations`"));
        assert!(mysql.contains("AUTO_INCREMENT"));
        assert!(mysql.ends_with("ENGINE=InnoDB DEFAULT CHARACTER SET=utf8mb4"));

        let sqlite = TrackingTableDdl::build(SqlDialect::SQLite, "migrations");
        assert!(sqlite.starts_with("CREATE TABLE IF NOT EXISTS \"migrations\""));
        assert!(sqlite.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));

        let sqlsrv = TrackingTableDdl::build(SqlDialect::SqlServer, "migrations");
        assert!(sqlsrv.starts_with("IF OBJECT_ID(N'migrations', N'U') IS NULL CREATE TABLE [migrations]"));
        assert!(sqlsrv.contains("IDENTITY(1,1)"));
        assert!(sqlsrv.contains("[created_at] DATETIME"));

        let pgsql = TrackingTableDdl::build(SqlDialect::PostgreSQL, "app_migrations");
        assert!(pgsql.starts_with("CREATE TABLE IF NOT EXISTS \"app_migrations\""));
        assert!(pgsql.contains("\"id\" SERIAL"));
    }

    #[test]
    fn test_unknown_backend_yields_empty_statement() {
        assert_eq!(TrackingTableDdl::for_name("oracle", "migrations"), "");
        assert_eq!(
            TrackingTableDdl::for_name("pgsql", "migrations"),
            TrackingTableDdl::build(SqlDialect::PostgreSQL, "migrations")
        );
    }
}
