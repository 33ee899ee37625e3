//! Secondary lookup indexes, created after all bulk loading so the
//! insert-heavy steps pay no index maintenance cost.

use async_trait::async_trait;
use sea_orm_migration::prelude::{Alias, Index};
use sea_orm_migration::SchemaManager;

use crate::errors::MigrateError;
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct CreateIndexes;

const INDEXES: [(&str, &str, &str); 8] = [
    ("idx_job_po_id", "job", "po_id"),
    ("idx_order_item_job_id", "order_item", "job_id"),
    ("idx_order_item_part_id", "order_item", "part_id"),
    ("idx_part_drawing_number", "part", "drawing_number"),
    ("idx_part_tree_child_id", "part_tree", "child_id"),
    ("idx_shipment_item_shipment_id", "shipment_item", "shipment_id"),
    ("idx_drawing_file_file_name", "drawing_file", "file_name"),
    ("idx_folder_mapping_customer_id", "folder_mapping", "customer_id"),
];

#[async_trait]
impl MigrationStep for CreateIndexes {
    fn name(&self) -> &'static str {
        "m0006_create_indexes"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let manager = SchemaManager::new(&ctx.db);
        for (name, table, column) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Alias::new(table))
                        .col(Alias::new(column))
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Reversible
    }

    async fn down(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let manager = SchemaManager::new(&ctx.db);
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(name).table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
