//! Migration Runner - Executes migrations against the database
//!
//! One invocation runs one action over the pending units in registry order,
//! then records the successes in the tracking table.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::definitions::{MigrationAction, MigrationConfig, MigrationRunResult, RecordingMode, UnitStatus};
use super::log::{ConsoleLog, MigrationLog};
use super::registry::MigrationRegistry;
use super::store::AppliedMigrationStore;
use crate::backends::DatabaseFacade;
use crate::error::OrmResult;

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    db: Arc<dyn DatabaseFacade>,
    registry: MigrationRegistry,
    store: AppliedMigrationStore,
    log: Arc<dyn MigrationLog>,
    recording: RecordingMode,
}

impl MigrationRunner {
    /// Create a runner; the tracking table comes from `config`, units from `registry`
    pub fn new(db: Arc<dyn DatabaseFacade>, registry: MigrationRegistry, config: &MigrationConfig) -> Self {
        let store = AppliedMigrationStore::new(Arc::clone(&db), &config.migrations_table);
        Self {
            db,
            registry,
            store,
            log: Arc::new(ConsoleLog),
            recording: config.recording,
        }
    }

    /// Send progress lines to `log` instead of the console
    pub fn with_log(mut self, log: Arc<dyn MigrationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_recording(mut self, recording: RecordingMode) -> Self {
        self.recording = recording;
        self
    }

    pub fn store(&self) -> &AppliedMigrationStore {
        &self.store
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Run `action` for every pending unit
    pub async fn run(&self, action: MigrationAction) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();
        let mut result = MigrationRunResult::empty(action);

        match self.run_pending(action, &mut result).await {
            Ok(()) => {
                result.execution_time_ms = start_time.elapsed().as_millis();
                info!(
                    "{} run finished: {} applied, {} skipped of {} pending",
                    action,
                    result.applied_count(),
                    result.skipped_count(),
                    result.pending_count
                );
                Ok(result)
            }
            Err(e) => {
                self.log.log(&format!("Migration aborted: {}", e));
                error!(
                    "{} run aborted after {} successful unit(s): {}",
                    action,
                    result.applied_count(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_pending(&self, action: MigrationAction, result: &mut MigrationRunResult) -> OrmResult<()> {
        self.store.ensure_table().await?;
        let applied = self.store.applied_names(action).await?;

        let pending = match self.registry.pending(&applied) {
            Ok(pending) => pending,
            Err(e) => {
                debug!("{}", e);
                self.log.log("No files to migrate.");
                result.directory_missing = true;
                return Ok(());
            }
        };
        result.pending_count = pending.len();

        let dialect = self.db.dialect();
        for descriptor in &pending {
            let unit = self.registry.instantiate(descriptor, dialect)?;
            self.log.log(&format!("Applying migration {} {}", action, descriptor.name));

            if unit.run(action, self.db.as_ref()).await? {
                match self.recording {
                    RecordingMode::PerUnit => self.store.replace_applied(&descriptor.name, action).await?,
                    RecordingMode::Batch => {
                        self.store.clear_applied(&descriptor.name, action).await?;
                    }
                }
                result.applied.push(descriptor.name.clone());
                self.log.log(&format!("Applied migration {} {}", action, descriptor.name));
            } else {
                result.skipped.push(descriptor.name.clone());
                self.log.log(&format!("No applyable migration {} {}", action, descriptor.name));
            }
        }

        if result.applied.is_empty() {
            self.log.log("All migrations are applied");
        } else if self.recording == RecordingMode::Batch {
            self.store.record_applied(&result.applied, action).await?;
        }
        Ok(())
    }

    /// Recorded actions of every discovered unit
    pub async fn status(&self) -> OrmResult<Vec<UnitStatus>> {
        self.store.ensure_table().await?;
        let records = self.store.records().await?;

        Ok(self
            .registry
            .discover()?
            .into_iter()
            .map(|unit| {
                let recorded = MigrationAction::ALL
                    .into_iter()
                    .filter(|action| {
                        records
                            .iter()
                            .any(|r| r.migration == unit.name && r.action == *action)
                    })
                    .collect();
                UnitStatus {
                    migration: unit.name,
                    recorded,
                }
            })
            .collect())
    }
}

/// Run the action named by `action` (`up`, `down`, `seed` or their aliases)
pub async fn apply_migrations(runner: &MigrationRunner, action: &str) -> OrmResult<MigrationRunResult> {
    runner.run(action.parse()?).await
}
