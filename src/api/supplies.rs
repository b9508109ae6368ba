//! Supply item and movement handlers.

use super::{
    AppState,
    extract::{ApiJson, ApiPath, CallerPatient},
};
use crate::{
    core::{
        stock::{self, AppliedMovement},
        supply::{self, NewSupply, SupplyChanges},
    },
    entities::{MovementModel, MovementReason, SupplyCategory, SupplyModel},
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use sea_orm::prelude::Date;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplyRequest {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: SupplyCategory,
    #[serde(default)]
    pub minimum_threshold: i64,
    pub unit: Option<String>,
    pub expires_on: Option<Date>,
    #[serde(default)]
    pub opening_balance: i64,
}

const fn default_category() -> SupplyCategory {
    SupplyCategory::Other
}

impl From<CreateSupplyRequest> for NewSupply {
    fn from(req: CreateSupplyRequest) -> Self {
        Self {
            name: req.name,
            category: req.category,
            minimum_threshold: req.minimum_threshold,
            unit: req.unit,
            expires_on: req.expires_on,
            opening_balance: req.opening_balance,
        }
    }
}

// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplyRequest {
    pub name: Option<String>,
    pub category: Option<SupplyCategory>,
    pub minimum_threshold: Option<i64>,
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_on: Option<Option<Date>>,
}

impl From<UpdateSupplyRequest> for SupplyChanges {
    fn from(req: UpdateSupplyRequest) -> Self {
        Self {
            name: req.name,
            category: req.category,
            minimum_threshold: req.minimum_threshold,
            unit: req.unit,
            expires_on: req.expires_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub quantity: i64,
    pub reason: MovementReason,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiJson(body): ApiJson<CreateSupplyRequest>,
) -> Result<(StatusCode, Json<SupplyModel>)> {
    let created = supply::create_supply(&state.db, caller.patient.id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(State(state): State<AppState>, caller: CallerPatient) -> Result<Json<Vec<SupplyModel>>> {
    Ok(Json(supply::list_by_patient(&state.db, caller.patient.id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SupplyModel>> {
    Ok(Json(supply::get_owned(&state.db, caller.patient.id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateSupplyRequest>,
) -> Result<Json<SupplyModel>> {
    let updated = supply::update_supply(&state.db, caller.patient.id, id, body.into()).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    supply::delete_supply(&state.db, caller.patient.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /supplies/{id}/movements` - 201 with the movement and the new balance.
pub async fn create_movement(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MovementRequest>,
) -> Result<(StatusCode, Json<AppliedMovement>)> {
    let item = supply::get_owned(&state.db, caller.patient.id, id).await?;
    let applied = stock::apply_movement(
        &state.db,
        &item,
        body.quantity,
        body.reason,
        body.note.unwrap_or_default(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(applied)))
}

pub async fn list_movements(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<MovementModel>>> {
    let item = supply::get_owned(&state.db, caller.patient.id, id).await?;
    Ok(Json(supply::list_movements(&state.db, item.id).await?))
}
