//! Durable record of applied migration steps.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use sea_orm_migration::prelude::{ColumnDef, DeriveIden, Table};
use tracing::debug;

use crate::entities::migration_ledger;
use crate::errors::MigrateError;

#[derive(DeriveIden)]
enum MigrationLedger {
    Table,
    Id,
    Name,
    AppliedAt,
}

/// Thin accessor over the `migration_ledger` table. Append-only,
/// except for the strictly last-in-first-out `remove` used by undo.
pub struct Ledger;

impl Ledger {
    pub async fn ensure_table(db: &impl ConnectionTrait) -> Result<(), MigrateError> {
        let stmt = Table::create()
            .table(MigrationLedger::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(MigrationLedger::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(MigrationLedger::Name)
                    .string()
                    .not_null()
                    .unique_key(),
            )
            .col(
                ColumnDef::new(MigrationLedger::AppliedAt)
                    .timestamp()
                    .not_null(),
            )
            .to_owned();

        let builder = db.get_database_backend();
        db.execute(builder.build(&stmt)).await?;
        Ok(())
    }

    /// Applied steps, oldest first.
    pub async fn applied(db: &impl ConnectionTrait) -> Result<Vec<migration_ledger::Model>, MigrateError> {
        Ok(migration_ledger::Entity::find()
            .order_by_asc(migration_ledger::Column::Id)
            .all(db)
            .await?)
    }

    /// Records a successfully applied step. Called only after `up`
    /// returned Ok, and before the next unit starts.
    pub async fn record(db: &impl ConnectionTrait, name: &str) -> Result<(), MigrateError> {
        let model = migration_ledger::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            applied_at: Set(Utc::now()),
        };
        model.insert(db).await?;
        debug!(step = name, "ledger entry recorded");
        Ok(())
    }

    /// Pops the entry for an undone step.
    pub async fn remove(db: &impl ConnectionTrait, name: &str) -> Result<(), MigrateError> {
        migration_ledger::Entity::delete_many()
            .filter(migration_ledger::Column::Name.eq(name))
            .exec(db)
            .await?;
        debug!(step = name, "ledger entry removed");
        Ok(())
    }
}
