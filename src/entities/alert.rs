//! Alert entity - a standing notification for a patient.
//!
//! Low-stock alerts point at their supply item explicitly; at most one active
//! alert of a kind may exist per item (enforced by a partial unique index
//! created in `config::database`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Alert category
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Balance fell under the item's minimum threshold
    #[sea_orm(string_value = "low_stock")]
    LowStock,
}

/// Alert database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the alert
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning patient
    pub patient_id: i64,
    /// Supply item the alert is about
    pub supply_id: i64,
    /// Alert category
    pub kind: AlertKind,
    /// Text shown to the patient
    pub message: String,
    /// Whether the alert still needs acknowledgment
    pub active: bool,
    /// When the alert was opened
    pub created_at: DateTimeUtc,
    /// First time the alert was acknowledged; kept across re-activation
    pub resolved_at: Option<DateTimeUtc>,
}

/// Defines relationships between Alert and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each alert belongs to one patient
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_delete = "Cascade"
    )]
    Patient,
    /// Each alert refers to one supply item
    #[sea_orm(
        belongs_to = "super::supply::Entity",
        from = "Column::SupplyId",
        to = "super::supply::Column::Id",
        on_delete = "Cascade"
    )]
    Supply,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::supply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supply.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
