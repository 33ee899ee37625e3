//! Orders the discovered steps, applies pending ones and keeps the
//! ledger in lockstep: a step's ledger entry is written only after its
//! `up` succeeded, and a failure aborts the run with the ledger left
//! at the last completed unit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::errors::MigrateError;
use crate::migrate::ledger::Ledger;
use crate::migrate::{MigrationStep, Rollback, StepContext};

/// Pure read of where the migration stands.
#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub applied: Vec<AppliedStep>,
    pub pending: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AppliedStep {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub struct Runner {
    ctx: StepContext,
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Runner {
    pub fn new(ctx: StepContext, steps: Vec<Box<dyn MigrationStep>>) -> Self {
        Self { ctx, steps }
    }

    /// Applies every discovered step not yet in the ledger, in order.
    /// Returns the names applied in this run.
    ///
    /// On failure the run aborts immediately; already-recorded units
    /// stay recorded and the failing unit leaves no ledger entry.
    pub async fn apply_pending(&self) -> Result<Vec<String>, MigrateError> {
        Ledger::ensure_table(&self.ctx.db).await?;
        let applied: HashSet<String> = Ledger::applied(&self.ctx.db)
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();

        let mut ran = Vec::new();
        for step in &self.steps {
            if applied.contains(step.name()) {
                continue;
            }
            info!(step = step.name(), "applying migration step");
            if let Err(e) = step.up(&self.ctx).await {
                error!(step = step.name(), error = %e, "migration step failed, aborting run");
                return Err(e);
            }
            Ledger::record(&self.ctx.db, step.name()).await?;
            info!(step = step.name(), "migration step applied");
            ran.push(step.name().to_string());
        }

        if ran.is_empty() {
            info!("no pending migration steps");
        }
        Ok(ran)
    }

    /// Undoes the most recently applied step, strictly LIFO.
    ///
    /// Irreversible steps are refused with their declared reason and
    /// the ledger is left untouched; manual recovery is required.
    pub async fn undo_last(&self) -> Result<String, MigrateError> {
        Ledger::ensure_table(&self.ctx.db).await?;
        let applied = Ledger::applied(&self.ctx.db).await?;
        let Some(last) = applied.last() else {
            return Err(MigrateError::NothingToUndo);
        };

        let step = self
            .steps
            .iter()
            .find(|s| s.name() == last.name)
            .ok_or_else(|| MigrateError::UnknownStep(last.name.clone()))?;

        match step.rollback() {
            Rollback::Irreversible { reason } => {
                warn!(
                    step = step.name(),
                    reason, "refusing to undo irreversible step; manual recovery required"
                );
                Err(MigrateError::Irreversible {
                    name: step.name().to_string(),
                    reason: reason.to_string(),
                })
            }
            Rollback::Reversible => {
                info!(step = step.name(), "undoing migration step");
                step.down(&self.ctx).await?;
                Ledger::remove(&self.ctx.db, step.name()).await?;
                info!(step = step.name(), "migration step undone");
                Ok(step.name().to_string())
            }
        }
    }

    /// Partitions the discovered steps into applied and pending by
    /// name-membership against the ledger. Pure read.
    pub async fn status(&self) -> Result<StatusReport, MigrateError> {
        Ledger::ensure_table(&self.ctx.db).await?;
        let applied = Ledger::applied(&self.ctx.db).await?;
        let applied_names: HashSet<&str> = applied.iter().map(|m| m.name.as_str()).collect();

        let pending = self
            .steps
            .iter()
            .map(|s| s.name())
            .filter(|name| !applied_names.contains(name))
            .map(str::to_string)
            .collect();

        Ok(StatusReport {
            applied: applied
                .into_iter()
                .map(|m| AppliedStep {
                    name: m.name,
                    applied_at: m.applied_at,
                })
                .collect(),
            pending,
        })
    }
}
