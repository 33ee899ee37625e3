//! Matcher-driven backfill of `drawing_file.part_id`.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait, Value};
use tracing::info;

use crate::entities::drawing_file;
use crate::errors::MigrateError;
use crate::etl::drawings;
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct LinkDrawings;

#[async_trait]
impl MigrationStep for LinkDrawings {
    fn name(&self) -> &'static str {
        "m0005_link_drawings"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let txn = ctx.db.begin().await?;
        let summary = drawings::link_all_parts(&txn).await?;
        txn.commit().await?;

        info!(
            summary = %serde_json::to_string(&summary).unwrap_or_default(),
            "drawing link pass complete"
        );
        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Reversible
    }

    /// Clearing the automatic links loses nothing that a re-run of
    /// the matcher cannot rebuild.
    async fn down(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        drawing_file::Entity::update_many()
            .col_expr(drawing_file::Column::PartId, Expr::value(Value::BigInt(None)))
            .filter(drawing_file::Column::PartId.is_not_null())
            .exec(&ctx.db)
            .await?;
        Ok(())
    }
}
