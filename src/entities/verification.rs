//! Verification entity - the persisted outcome of checking a kit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a verification came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum VerificationOrigin {
    /// Authenticated owner checking their own kit
    #[sea_orm(string_value = "private")]
    Private,
    /// Anonymous holder of the public token (QR scan)
    #[sea_orm(string_value = "public_qr")]
    PublicQr,
}

/// Verification record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "verifications")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Kit that was verified
    pub kit_id: i64,
    /// Private or public origin
    pub origin: VerificationOrigin,
    /// True when nothing was missing
    pub ok: bool,
    /// Label to missing quantity, e.g. `{"Tiras": 1}`
    pub shortfalls: Json,
    /// Account that verified; `None` for public origin
    pub verified_by: Option<String>,
    /// When the verification was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Verification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one kit
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
