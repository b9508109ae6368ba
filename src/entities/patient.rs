//! Patient entity - the tenant that owns every supply, alert and kit.
//!
//! A patient is created once per account by the onboarding step; all other
//! rows cascade from it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Patient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the patient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identity of the account this patient belongs to (1:1)
    #[sea_orm(unique)]
    pub account_id: String,
    /// Name shown in the UI
    pub display_name: String,
    /// When the patient was onboarded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Patient and the rows it owns
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One patient has many supply items
    #[sea_orm(has_many = "super::supply::Entity")]
    Supplies,
    /// One patient has many alerts
    #[sea_orm(has_many = "super::alert::Entity")]
    Alerts,
    /// One patient has many kits
    #[sea_orm(has_many = "super::kit::Entity")]
    Kits,
}

impl Related<super::supply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplies.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl Related<super::kit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Kits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
