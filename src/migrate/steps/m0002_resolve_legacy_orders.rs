//! Bulk entity resolution over the legacy order export. One
//! transaction for the whole unit: a mid-run failure leaves no
//! partially-applied rows.

use async_trait::async_trait;
use sea_orm::TransactionTrait;
use tracing::{info, warn};

use crate::errors::MigrateError;
use crate::etl::resolve::{self, RunContext};
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct ResolveLegacyOrders;

#[async_trait]
impl MigrationStep for ResolveLegacyOrders {
    fn name(&self) -> &'static str {
        "m0002_resolve_legacy_orders"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        if ctx.source.orders.is_empty() {
            warn!("legacy order feed is empty; nothing to resolve");
            return Ok(());
        }

        let txn = ctx.db.begin().await?;
        let mut run_ctx = RunContext::new(ctx.run_date);
        let summary = resolve::run(&txn, &ctx.source.orders, &mut run_ctx).await?;
        txn.commit().await?;

        info!(
            summary = %serde_json::to_string(&summary).unwrap_or_default(),
            "legacy order resolution complete"
        );
        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Irreversible {
            reason: "bulk import keeps no per-row provenance; restore the database from backup",
        }
    }
}
