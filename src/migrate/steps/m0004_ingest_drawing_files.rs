//! Loads the filesystem scan feed into `drawing_file`.

use async_trait::async_trait;
use sea_orm::TransactionTrait;
use tracing::{info, warn};

use crate::errors::MigrateError;
use crate::etl::drawings;
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct IngestDrawingFiles;

#[async_trait]
impl MigrationStep for IngestDrawingFiles {
    fn name(&self) -> &'static str {
        "m0004_ingest_drawing_files"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let Some(feed) = &ctx.source.scan else {
            warn!("no scan feed configured; skipping drawing ingestion");
            return Ok(());
        };

        let txn = ctx.db.begin().await?;
        let summary = drawings::ingest_scan_feed(&txn, feed).await?;
        txn.commit().await?;

        info!(
            summary = %serde_json::to_string(&summary).unwrap_or_default(),
            "scan feed ingestion complete"
        );
        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Irreversible {
            reason: "re-scanned files were merged into existing records; restore from backup",
        }
    }
}
