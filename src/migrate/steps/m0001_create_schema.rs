//! Creates the normalized table set in dependency order. Composite
//! unique keys are created here (they are correctness, not
//! performance); secondary lookup indexes live in the final step.

use async_trait::async_trait;
use sea_orm_migration::prelude::{
    ColumnDef, DeriveIden, ForeignKey, ForeignKeyAction, Index, Table,
};
use sea_orm_migration::SchemaManager;

use crate::errors::MigrateError;
use crate::migrate::{MigrationStep, Rollback, StepContext};

pub struct CreateSchema;

#[derive(DeriveIden)]
enum Customer {
    Table,
    Id,
    CustomerName,
    UsageCount,
    LastUsed,
}

#[derive(DeriveIden)]
enum CustomerContact {
    Table,
    Id,
    CustomerId,
    ContactName,
    UsageCount,
}

#[derive(DeriveIden)]
enum PurchaseOrder {
    Table,
    Id,
    PoNumber,
    OeNumber,
    ContactId,
    IsActive,
}

#[derive(DeriveIden)]
enum Job {
    Table,
    Id,
    JobNumber,
    PoId,
    Priority,
}

#[derive(DeriveIden)]
enum Part {
    Table,
    Id,
    PreviousId,
    NextId,
    DrawingNumber,
    Revision,
    Description,
    IsAssembly,
    UnitPrice,
}

#[derive(DeriveIden)]
enum OrderItem {
    Table,
    Id,
    JobId,
    PartId,
    LineNumber,
    Quantity,
    ActualPrice,
    DrawingReleaseDate,
    DeliveryRequiredDate,
    Status,
}

#[derive(DeriveIden)]
enum PartTree {
    Table,
    Id,
    ParentId,
    ChildId,
    Quantity,
}

#[derive(DeriveIden)]
enum Shipment {
    Table,
    Id,
    PackingSlipNumber,
    InvoiceNumber,
    DeliveryShippedDate,
}

#[derive(DeriveIden)]
enum ShipmentItem {
    Table,
    Id,
    OrderItemId,
    ShipmentId,
    Quantity,
}

#[derive(DeriveIden)]
enum DrawingFile {
    Table,
    Id,
    PartId,
    FileName,
    FilePath,
    IsActive,
    LastModifiedAt,
    Revision,
}

#[derive(DeriveIden)]
enum FolderMapping {
    Table,
    Id,
    CustomerId,
    FolderName,
    IsVerified,
}

fn pk(col: impl sea_orm_migration::prelude::IntoIden) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    def.big_integer().not_null().auto_increment().primary_key();
    def
}

#[async_trait]
impl MigrationStep for CreateSchema {
    fn name(&self) -> &'static str {
        "m0001_create_schema"
    }

    async fn up(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let manager = SchemaManager::new(&ctx.db);

        manager
            .create_table(
                Table::create()
                    .table(Customer::Table)
                    .if_not_exists()
                    .col(&mut pk(Customer::Id))
                    .col(
                        ColumnDef::new(Customer::CustomerName)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Customer::UsageCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Customer::LastUsed).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerContact::Table)
                    .if_not_exists()
                    .col(&mut pk(CustomerContact::Id))
                    .col(
                        ColumnDef::new(CustomerContact::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerContact::ContactName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerContact::UsageCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_contact_customer_id")
                            .from(CustomerContact::Table, CustomerContact::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_customer_contact_customer_contact")
                    .table(CustomerContact::Table)
                    .col(CustomerContact::CustomerId)
                    .col(CustomerContact::ContactName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrder::Table)
                    .if_not_exists()
                    .col(&mut pk(PurchaseOrder::Id))
                    .col(
                        ColumnDef::new(PurchaseOrder::PoNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrder::OeNumber).string().null())
                    .col(ColumnDef::new(PurchaseOrder::ContactId).big_integer().null())
                    .col(
                        ColumnDef::new(PurchaseOrder::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_contact_id")
                            .from(PurchaseOrder::Table, PurchaseOrder::ContactId)
                            .to(CustomerContact::Table, CustomerContact::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(&mut pk(Job::Id))
                    .col(
                        ColumnDef::new(Job::JobNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Job::PoId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Job::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_po_id")
                            .from(Job::Table, Job::PoId)
                            .to(PurchaseOrder::Table, PurchaseOrder::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Part::Table)
                    .if_not_exists()
                    .col(&mut pk(Part::Id))
                    .col(ColumnDef::new(Part::PreviousId).big_integer().null())
                    .col(ColumnDef::new(Part::NextId).big_integer().null())
                    .col(ColumnDef::new(Part::DrawingNumber).string().not_null())
                    .col(
                        ColumnDef::new(Part::Revision)
                            .string()
                            .not_null()
                            .default("-"),
                    )
                    .col(ColumnDef::new(Part::Description).string().null())
                    .col(ColumnDef::new(Part::IsAssembly).integer().null())
                    .col(ColumnDef::new(Part::UnitPrice).decimal().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_part_drawing_revision")
                    .table(Part::Table)
                    .col(Part::DrawingNumber)
                    .col(Part::Revision)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItem::Table)
                    .if_not_exists()
                    .col(&mut pk(OrderItem::Id))
                    .col(ColumnDef::new(OrderItem::JobId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItem::PartId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItem::LineNumber).integer().not_null())
                    .col(
                        ColumnDef::new(OrderItem::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(OrderItem::ActualPrice).decimal().null())
                    .col(ColumnDef::new(OrderItem::DrawingReleaseDate).date().null())
                    .col(
                        ColumnDef::new(OrderItem::DeliveryRequiredDate)
                            .date()
                            .null(),
                    )
                    .col(ColumnDef::new(OrderItem::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_item_job_id")
                            .from(OrderItem::Table, OrderItem::JobId)
                            .to(Job::Table, Job::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_item_part_id")
                            .from(OrderItem::Table, OrderItem::PartId)
                            .to(Part::Table, Part::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_order_item_job_line")
                    .table(OrderItem::Table)
                    .col(OrderItem::JobId)
                    .col(OrderItem::LineNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PartTree::Table)
                    .if_not_exists()
                    .col(&mut pk(PartTree::Id))
                    .col(ColumnDef::new(PartTree::ParentId).big_integer().not_null())
                    .col(ColumnDef::new(PartTree::ChildId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PartTree::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_part_tree_parent_id")
                            .from(PartTree::Table, PartTree::ParentId)
                            .to(Part::Table, Part::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_part_tree_child_id")
                            .from(PartTree::Table, PartTree::ChildId)
                            .to(Part::Table, Part::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_part_tree_parent_child")
                    .table(PartTree::Table)
                    .col(PartTree::ParentId)
                    .col(PartTree::ChildId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Shipment::Table)
                    .if_not_exists()
                    .col(&mut pk(Shipment::Id))
                    .col(
                        ColumnDef::new(Shipment::PackingSlipNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Shipment::InvoiceNumber)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Shipment::DeliveryShippedDate)
                            .date()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShipmentItem::Table)
                    .if_not_exists()
                    .col(&mut pk(ShipmentItem::Id))
                    .col(
                        ColumnDef::new(ShipmentItem::OrderItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentItem::ShipmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentItem::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipment_item_order_item_id")
                            .from(ShipmentItem::Table, ShipmentItem::OrderItemId)
                            .to(OrderItem::Table, OrderItem::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipment_item_shipment_id")
                            .from(ShipmentItem::Table, ShipmentItem::ShipmentId)
                            .to(Shipment::Table, Shipment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_shipment_item_order_item_shipment")
                    .table(ShipmentItem::Table)
                    .col(ShipmentItem::OrderItemId)
                    .col(ShipmentItem::ShipmentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DrawingFile::Table)
                    .if_not_exists()
                    .col(&mut pk(DrawingFile::Id))
                    .col(ColumnDef::new(DrawingFile::PartId).big_integer().null())
                    .col(ColumnDef::new(DrawingFile::FileName).string().not_null())
                    .col(
                        ColumnDef::new(DrawingFile::FilePath)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DrawingFile::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DrawingFile::LastModifiedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DrawingFile::Revision)
                            .string()
                            .not_null()
                            .default("-"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_drawing_file_part_id")
                            .from(DrawingFile::Table, DrawingFile::PartId)
                            .to(Part::Table, Part::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FolderMapping::Table)
                    .if_not_exists()
                    .col(&mut pk(FolderMapping::Id))
                    .col(
                        ColumnDef::new(FolderMapping::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FolderMapping::FolderName).string().not_null())
                    .col(
                        ColumnDef::new(FolderMapping::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folder_mapping_customer_id")
                            .from(FolderMapping::Table, FolderMapping::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    fn rollback(&self) -> Rollback {
        Rollback::Reversible
    }

    async fn down(&self, ctx: &StepContext) -> Result<(), MigrateError> {
        let manager = SchemaManager::new(&ctx.db);
        // Reverse dependency order.
        for table in [
            Table::drop().table(FolderMapping::Table).to_owned(),
            Table::drop().table(DrawingFile::Table).to_owned(),
            Table::drop().table(ShipmentItem::Table).to_owned(),
            Table::drop().table(Shipment::Table).to_owned(),
            Table::drop().table(PartTree::Table).to_owned(),
            Table::drop().table(OrderItem::Table).to_owned(),
            Table::drop().table(Part::Table).to_owned(),
            Table::drop().table(Job::Table).to_owned(),
            Table::drop().table(PurchaseOrder::Table).to_owned(),
            Table::drop().table(CustomerContact::Table).to_owned(),
            Table::drop().table(Customer::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}
