use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A file record from the network-drive scan feed. `part_id` stays
/// null at ingestion; the reconciliation matcher populates it later.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drawing_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub part_id: Option<i64>,
    pub file_name: String,
    #[sea_orm(unique)]
    pub file_path: String,
    pub is_active: bool,
    pub last_modified_at: DateTime<Utc>,
    pub revision: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Part,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
