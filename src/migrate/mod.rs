//! Migration framework: ordered, ledger-tracked steps with explicit
//! reversible/irreversible rollback declarations.

pub mod ledger;
pub mod runner;
pub mod steps;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::errors::MigrateError;
use crate::etl::source::SourceData;

/// Whether a step can be undone. Destructive steps declare themselves
/// `Irreversible` with an operator-facing reason, so the runner
/// refuses to undo them instead of silently no-opping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rollback {
    Reversible,
    Irreversible { reason: &'static str },
}

/// Everything a step may need: the open database connection, the
/// loaded source feeds and the run date used for synthetic keys.
#[derive(Clone)]
pub struct StepContext {
    pub db: DatabaseConnection,
    pub source: SourceData,
    pub run_date: NaiveDate,
}

impl StepContext {
    pub fn new(db: DatabaseConnection, source: SourceData) -> Self {
        Self {
            db,
            source,
            run_date: Utc::now().date_naive(),
        }
    }

    /// Pins the run date, primarily for deterministic tests.
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }
}

/// One named, orderable migration unit.
///
/// `up` owns its internal transactional discipline: bulk work runs in
/// one transaction per unit, so a mid-unit failure leaves no partial
/// rows for that unit. The runner records success in the ledger only
/// after `up` returns.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError>;

    fn rollback(&self) -> Rollback;

    /// Reverse logic; only called when `rollback()` is `Reversible`.
    async fn down(&self, _ctx: &StepContext) -> Result<(), MigrateError> {
        Err(MigrateError::structural(format!(
            "step '{}' declares no down logic",
            self.name()
        )))
    }
}
