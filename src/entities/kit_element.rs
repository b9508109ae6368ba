//! Kit element entity - one required (label, quantity) line of a kit.
//!
//! `(kit_id, label)` is unique; the set is always replaced wholesale.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kit element database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kit_elements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the element
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Kit this element belongs to
    pub kit_id: i64,
    /// Item label, unique within the kit
    pub label: String,
    /// How many must be present
    pub required_quantity: i64,
    /// Unit label
    pub unit: String,
}

/// Defines relationships between `KitElement` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each element belongs to one kit
    #[sea_orm(
        belongs_to = "super::kit::Entity",
        from = "Column::KitId",
        to = "super::kit::Column::Id",
        on_delete = "Cascade"
    )]
    Kit,
}

impl Related<super::kit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Kit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
