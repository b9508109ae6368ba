//! Supply entity - a trackable medical consumable with a running balance.
//!
//! `current_balance` is a cached projection of the movement ledger and is only
//! ever changed through an atomic `balance = balance + delta` update issued by
//! the stock reconciler.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of consumable
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SupplyCategory {
    /// Insulin pens, vials or cartridges
    #[sea_orm(string_value = "insulin")]
    Insulin,
    /// Glucose meter test strips
    #[sea_orm(string_value = "test_strips")]
    TestStrips,
    /// Pen needles and syringes
    #[sea_orm(string_value = "needles")]
    Needles,
    /// Continuous glucose monitoring sensors
    #[sea_orm(string_value = "sensor")]
    Sensor,
    /// Anything else
    #[sea_orm(string_value = "other")]
    Other,
}

/// Supply item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplies")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the supply item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning patient
    pub patient_id: i64,
    /// Display name (e.g., "Tiras", "Lantus")
    pub name: String,
    /// Consumable category
    pub category: SupplyCategory,
    /// Sum of all committed movement quantities
    pub current_balance: i64,
    /// Balance under which a low-stock alert is opened
    pub minimum_threshold: i64,
    /// Unit label (e.g., "u", "ml")
    pub unit: String,
    /// Optional expiry date of the current stock
    pub expires_on: Option<Date>,
    /// When the item was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Supply and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each supply item belongs to one patient
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_delete = "Cascade"
    )]
    Patient,
    /// One supply item has many movements
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
    /// One supply item has many alerts over its lifetime
    #[sea_orm(has_many = "super::alert::Entity")]
    Alerts,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
