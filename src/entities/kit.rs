//! Kit entity - a named checklist of required items, reachable publicly by token.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kits")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the kit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning patient
    pub patient_id: i64,
    /// Kit name (e.g., "School kit")
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Unguessable URL-safe token used by the public endpoints
    #[sea_orm(unique)]
    pub public_token: String,
    /// Inactive kits are invisible to the public endpoints
    pub active: bool,
    /// When the kit was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Kit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each kit belongs to one patient
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_delete = "Cascade"
    )]
    Patient,
    /// One kit has many required elements
    #[sea_orm(has_many = "super::kit_element::Entity")]
    Elements,
    /// One kit has many verification records
    #[sea_orm(has_many = "super::verification::Entity")]
    Verifications,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::kit_element::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Elements.def()
    }
}

impl Related<super::verification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Verifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
