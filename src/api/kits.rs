//! Owner-side kit handlers.

use super::{
    AppState,
    extract::{ApiJson, ApiPath, CallerPatient},
};
use crate::{
    core::{
        kit::{self, ElementInput, KitChanges, KitDetail, NewKit},
        qr::{self, KitQr},
        verification::{self, VerificationOutcome},
    },
    entities::{KitElementModel, KitModel, VerificationModel},
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ElementsRequest {
    pub items: Vec<ElementInput>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub items: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatedToken {
    pub new_token: String,
}

pub async fn create(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiJson(body): ApiJson<NewKit>,
) -> Result<(StatusCode, Json<KitModel>)> {
    let created = kit::create_kit(&state.db, caller.patient.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(State(state): State<AppState>, caller: CallerPatient) -> Result<Json<Vec<KitModel>>> {
    Ok(Json(kit::list_kits(&state.db, caller.patient.id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<KitDetail>> {
    Ok(Json(kit::get_detail(&state.db, caller.patient.id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<KitChanges>,
) -> Result<Json<KitModel>> {
    Ok(Json(kit::update_kit(&state.db, caller.patient.id, id, body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    kit::delete_kit(&state.db, caller.patient.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /kits/{id}/elements` - replace semantics, returns the new set.
pub async fn replace_elements(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ElementsRequest>,
) -> Result<Json<Vec<KitElementModel>>> {
    let elements = kit::replace_elements(&state.db, caller.patient.id, id, body.items).await?;
    Ok(Json(elements))
}

pub async fn rotate_token(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RotatedToken>> {
    let new_token = kit::rotate_token(&state.db, caller.patient.id, id).await?;
    Ok(Json(RotatedToken { new_token }))
}

pub async fn verifications(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<VerificationModel>>> {
    Ok(Json(kit::list_verifications(&state.db, caller.patient.id, id).await?))
}

pub async fn verify(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<VerificationOutcome>> {
    let outcome = verification::private_verify(
        &state.db,
        caller.patient.id,
        id,
        &caller.account_id,
        &body.items,
    )
    .await?;
    Ok(Json(outcome))
}

/// `GET /kits/{id}/qr` - public URL and its QR code as SVG.
pub async fn qr(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<KitQr>> {
    let kit = kit::get_owned(&state.db, caller.patient.id, id).await?;
    Ok(Json(qr::kit_qr(&state.config.public.base_url, &kit.public_token)?))
}
