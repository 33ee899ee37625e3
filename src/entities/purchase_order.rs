use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `po_number` is always non-empty and unique: source records lacking
/// a usable number (empty, "NPO", "VERBAL") get a synthetic
/// `NPO-<YYYYMMDD>-<CUSTOMER>-<seq>` number during resolution.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub po_number: String,
    pub oe_number: Option<String>,
    pub contact_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer_contact::Entity",
        from = "Column::ContactId",
        to = "super::customer_contact::Column::Id"
    )]
    Contact,
    #[sea_orm(has_many = "super::job::Entity")]
    Jobs,
}

impl Related<super::customer_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
