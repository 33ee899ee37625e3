use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One bill-of-materials edge: `child_id` is used inside `parent_id`'s
/// assembly, `quantity` times. Unique on `(parent_id, child_id)`;
/// self-references are filtered during construction. The graph is
/// directed but not guaranteed acyclic by the schema.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "part_tree")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::ParentId",
        to = "super::part::Column::Id"
    )]
    Parent,
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::ChildId",
        to = "super::part::Column::Id"
    )]
    Child,
}

impl ActiveModelBehavior for ActiveModel {}
