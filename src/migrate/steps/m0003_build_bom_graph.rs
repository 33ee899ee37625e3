//! Builds the BOM graph and the part version chains from the flat
//! assembly association export.

use async_trait::async_trait;
use sea_orm::TransactionTrait;
use tracing::{info, warn};

use crate::errors::MigrateError;
use crate::etl::bom::{self, BomSummary};
use crate::etl::resolve::RunContext;
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct BuildBomGraph;

#[async_trait]
impl MigrationStep for BuildBomGraph {
    fn name(&self) -> &'static str {
        "m0003_build_bom_graph"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let txn = ctx.db.begin().await?;
        let mut run_ctx = RunContext::new(ctx.run_date);
        let mut summary = BomSummary::default();

        if ctx.source.assemblies.is_empty() {
            warn!("assembly association feed is empty; only relinking version chains");
        } else {
            bom::backfill_missing_parts(&txn, &ctx.source.assemblies, &mut run_ctx, &mut summary)
                .await?;
            bom::build_edges(&txn, &ctx.source.assemblies, &mut summary).await?;
        }

        // Chains cover parts from the order import too, so this runs
        // even with an empty association feed.
        bom::build_version_chains(&txn, &mut summary).await?;
        bom::detect_cycles(&txn, &mut summary).await?;
        txn.commit().await?;

        info!(
            summary = %serde_json::to_string(&summary).unwrap_or_default(),
            "BOM construction complete"
        );
        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Irreversible {
            reason: "backfilled parts are indistinguishable from imported ones; restore from backup",
        }
    }
}
