//! Movement entity - one signed, immutable change to a supply item's balance.
//!
//! Rows are append-only: nothing in the crate updates or deletes a movement
//! other than the cascade from its supply item.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why the stock changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Restock
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Consumed by the patient
    #[sea_orm(string_value = "usage")]
    Usage,
    /// Manual correction (also used for opening balances)
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Discarded because it expired
    #[sea_orm(string_value = "expiry")]
    Expiry,
}

/// Movement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the movement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Supply item this movement applies to
    pub supply_id: i64,
    /// Signed quantity (positive inbound, negative outbound)
    pub quantity: i64,
    /// Reason for the change
    pub reason: MovementReason,
    /// Free-text note
    pub note: String,
    /// Assigned at commit
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Movement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each movement belongs to one supply item
    #[sea_orm(
        belongs_to = "super::supply::Entity",
        from = "Column::SupplyId",
        to = "super::supply::Column::Id",
        on_delete = "Cascade"
    )]
    Supply,
}

impl Related<super::supply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supply.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
