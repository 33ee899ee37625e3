use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A drawing at a specific revision. Natural key is
/// `(drawing_number, revision)` with revision defaulting to `"-"`.
///
/// `previous_id`/`next_id` form a doubly-linked version chain across
/// revisions of the same drawing number. The pairing invariant
/// (`a.next_id == b` implies `b.previous_id == a`) is checked by
/// validation queries, not enforced by the schema.
///
/// `is_assembly` is tri-state: `None` unknown, `0` component, `1`
/// assembly. Classification by the `-GA-` drawing-number convention is
/// a heuristic, not a guaranteed business rule.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "part")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub previous_id: Option<i64>,
    pub next_id: Option<i64>,
    pub drawing_number: String,
    pub revision: String,
    pub description: Option<String>,
    pub is_assembly: Option<i32>,
    pub unit_price: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::drawing_file::Entity")]
    DrawingFiles,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::drawing_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DrawingFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
