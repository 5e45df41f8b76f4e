//! Applied-Migration Store - reads and writes the tracking table
//!
//! Every statement goes through bound parameters; unit names never reach the
//! SQL text.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::definitions::{AppliedMigrationRecord, MigrationAction};
use super::schema_builder::TrackingTableDdl;
use crate::backends::{DatabaseFacade, DatabaseValue, Statement};
use crate::error::OrmResult;

/// Tracking-table access for one physical table
pub struct AppliedMigrationStore {
    db: Arc<dyn DatabaseFacade>,
    table: String,
}

impl AppliedMigrationStore {
    /// Create a store for the logical table name; the connection prefix is applied
    pub fn new(db: Arc<dyn DatabaseFacade>, logical_table: &str) -> Self {
        let table = db.table_name(logical_table);
        Self { db, table }
    }

    /// Physical table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the tracking table if it is absent
    pub async fn ensure_table(&self) -> OrmResult<()> {
        let ddl = TrackingTableDdl::build(self.db.dialect(), &self.table);
        if ddl.trim().is_empty() {
            warn!("no tracking table DDL for {} backend; skipping", self.db.dialect());
            return Ok(());
        }
        self.db.execute(&ddl, &[]).await?;
        debug!("tracking table {} ready", self.table);
        Ok(())
    }

    /// Names recorded for `action`
    pub async fn applied_names(&self, action: MigrationAction) -> OrmResult<BTreeSet<String>> {
        let names = self
            .db
            .select_column(&self.table, "migration", &[("action", action.as_str().into())])
            .await?;
        Ok(names.into_iter().collect())
    }

    /// Record `names` for `action` with a single multi-row insert
    pub async fn record_applied(&self, names: &[String], action: MigrationAction) -> OrmResult<u64> {
        if names.is_empty() {
            return Ok(0);
        }
        let (sql, params) = self.insert_statement(names, action);
        self.db.execute(&sql, &params).await
    }

    /// Record a single unit
    pub async fn record_one(&self, name: &str, action: MigrationAction) -> OrmResult<u64> {
        self.record_applied(&[name.to_string()], action).await
    }

    /// Bookkeeping after `action` succeeded for `name`.
    ///
    /// Apply and reverse change schema state, so every row of the unit goes
    /// (a reversed unit is pending for apply again and vice versa). Seed only
    /// clears the unit's reverse row.
    pub async fn clear_applied(&self, name: &str, action: MigrationAction) -> OrmResult<u64> {
        let (sql, params) = self.clear_statement(name, action);
        self.db.execute(&sql, &params).await
    }

    /// [`clear_applied`](Self::clear_applied) then [`record_one`](Self::record_one)
    /// in one transaction, so a failed insert keeps the cleared rows
    pub async fn replace_applied(&self, name: &str, action: MigrationAction) -> OrmResult<()> {
        let statements = [
            self.clear_statement(name, action),
            self.insert_statement(&[name.to_string()], action),
        ];
        self.db.execute_in_transaction(&statements).await
    }

    fn clear_statement(&self, name: &str, action: MigrationAction) -> Statement {
        match action {
            MigrationAction::Apply | MigrationAction::Reverse => {
                self.db.delete_statement(&self.table, &[("migration", name.into())])
            }
            MigrationAction::Seed => self.db.delete_statement(
                &self.table,
                &[
                    ("migration", name.into()),
                    ("action", MigrationAction::Reverse.as_str().into()),
                ],
            ),
        }
    }

    fn insert_statement(&self, names: &[String], action: MigrationAction) -> Statement {
        let dialect = self.db.dialect();
        let mut params = Vec::with_capacity(names.len() * 2);
        let tuples: Vec<String> = names
            .iter()
            .map(|name| {
                let first = params.len();
                params.push(DatabaseValue::from(name.as_str()));
                params.push(DatabaseValue::from(action.as_str()));
                format!(
                    "({}, {})",
                    dialect.parameter_placeholder(first),
                    dialect.parameter_placeholder(first + 1)
                )
            })
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES {}",
            self.db.quote_identifier(&self.table),
            self.db.quote_identifier("migration"),
            self.db.quote_identifier("action"),
            tuples.join(", ")
        );
        (sql, params)
    }

    /// Every tracking row ordered by insertion
    pub async fn records(&self) -> OrmResult<Vec<AppliedMigrationRecord>> {
        let dialect = self.db.dialect();
        let sql = format!(
            "SELECT {}, {}, {} FROM {} ORDER BY {}",
            self.db.quote_identifier("migration"),
            self.db.quote_identifier("action"),
            dialect.timestamp_as_text(&self.db.quote_identifier("created_at")),
            self.db.quote_identifier(&self.table),
            self.db.quote_identifier("id"),
        );

        let mut records = Vec::new();
        for row in self.db.fetch_all(&sql, &[]).await? {
            let (Some(migration), Some(action)) = (row.text(0), row.text(1)) else {
                continue;
            };
            let action = match action.parse::<MigrationAction>() {
                Ok(action) => action,
                Err(_) => {
                    warn!("ignoring tracking row {} with unknown action '{}'", migration, action);
                    continue;
                }
            };
            records.push(AppliedMigrationRecord {
                migration,
                action,
                applied_at: row.text(2).as_deref().and_then(parse_timestamp),
            });
        }
        Ok(records)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
