//! Migration Unit Contract
//!
//! A unit exposes apply, reverse and seed. `Ok(true)` means the action took
//! effect, `Ok(false)` is a soft failure that leaves the unit pending, and
//! `Err` aborts the run.

use async_trait::async_trait;
use tracing::warn;

use super::definitions::MigrationAction;
use crate::backends::{DatabaseFacade, DropOutcome};
use crate::error::OrmResult;

#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Logical name of the table this unit owns, used by the default reverse
    fn table(&self) -> Option<&str> {
        None
    }

    /// Forward schema change
    async fn apply(&self, db: &dyn DatabaseFacade) -> OrmResult<bool>;

    /// Data population
    async fn seed(&self, db: &dyn DatabaseFacade) -> OrmResult<bool>;

    /// Drop the owned table if it exists; any database error reports `false`
    async fn reverse(&self, db: &dyn DatabaseFacade) -> OrmResult<bool> {
        let Some(table) = self.table() else {
            return Ok(false);
        };
        let physical = db.table_name(table);
        Ok(match db.drop_if_exists(&physical).await {
            DropOutcome::Dropped => true,
            DropOutcome::Missing => false,
            DropOutcome::Failed(e) => {
                warn!("dropping {} failed: {}", physical, e);
                false
            }
        })
    }

    /// Dispatch `action` to the matching method
    async fn run(&self, action: MigrationAction, db: &dyn DatabaseFacade) -> OrmResult<bool> {
        match action {
            MigrationAction::Apply => self.apply(db).await,
            MigrationAction::Reverse => self.reverse(db).await,
            MigrationAction::Seed => self.seed(db).await,
        }
    }
}

/// Unit backed by the sections of a `.sql` migration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFileMigration {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub seed: Vec<String>,
}

impl SqlFileMigration {
    async fn execute_all(statements: &[String], db: &dyn DatabaseFacade) -> OrmResult<bool> {
        if statements.is_empty() {
            return Ok(false);
        }
        for statement in statements {
            db.execute(statement, &[]).await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl MigrationUnit for SqlFileMigration {
    async fn apply(&self, db: &dyn DatabaseFacade) -> OrmResult<bool> {
        Self::execute_all(&self.up, db).await
    }

    async fn seed(&self, db: &dyn DatabaseFacade) -> OrmResult<bool> {
        Self::execute_all(&self.seed, db).await
    }

    async fn reverse(&self, db: &dyn DatabaseFacade) -> OrmResult<bool> {
        match Self::execute_all(&self.down, db).await {
            Ok(done) => Ok(done),
            Err(e) => {
                warn!("down section failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::AnyDatabase;

    struct Widgets;

    #[async_trait]
    impl MigrationUnit for Widgets {
        fn table(&self) -> Option<&str> {
            Some("widgets")
        }

        async fn apply(&self, db: &dyn DatabaseFacade) -> OrmResult<bool> {
            let table = db.quote_identifier(&db.table_name("widgets"));
            db.execute(&format!("CREATE TABLE {} (id INTEGER)", table), &[]).await?;
            Ok(true)
        }

        async fn seed(&self, _db: &dyn DatabaseFacade) -> OrmResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_default_reverse_reports_missing_table() {
        let db = AnyDatabase::connect_with_prefix("sqlite::memory:", "t_").await.unwrap();
        assert!(!Widgets.run(MigrationAction::Reverse, &db).await.unwrap());

        assert!(Widgets.run(MigrationAction::Apply, &db).await.unwrap());
        assert!(db.table_exists("t_widgets").await.unwrap());
        assert!(Widgets.run(MigrationAction::Reverse, &db).await.unwrap());
        assert!(!db.table_exists("t_widgets").await.unwrap());
    }

    #[tokio::test]
    async fn test_sql_file_unit_sections() {
        let db = AnyDatabase::connect("sqlite::memory:").await.unwrap();
        let unit = SqlFileMigration {
            up: vec!["CREATE TABLE notes (body TEXT)".to_string()],
            down: vec!["DROP TABLE notes".to_string()],
            seed: Vec::new(),
        };

        assert!(unit.apply(&db).await.unwrap());
        assert!(!unit.seed(&db).await.unwrap());
        assert!(unit.reverse(&db).await.unwrap());
        // Dropping again fails inside the database and is reported as false.
        assert!(!unit.reverse(&db).await.unwrap());
    }
}
