use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per distinct legacy customer name. `usage_count` and
/// `last_used` are maintained by the live application after go-live,
/// not by the migration.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub customer_name: String,
    pub usage_count: i32,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::customer_contact::Entity")]
    CustomerContacts,
    #[sea_orm(has_many = "super::folder_mapping::Entity")]
    FolderMappings,
}

impl Related<super::customer_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerContacts.def()
    }
}

impl Related<super::folder_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FolderMappings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
