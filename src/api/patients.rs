use super::{
    AppState,
    extract::{ApiJson, CallerAccount, CallerPatient},
};
use crate::{core::patient, entities::PatientModel, errors::Result};
use axum::{Json, extract::State};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    #[serde(default)]
    pub display_name: String,
}

/// `POST /patients` - called once by the identity layer when an account is created.
pub async fn onboard(
    State(state): State<AppState>,
    CallerAccount(account_id): CallerAccount,
    body: Option<ApiJson<OnboardRequest>>,
) -> Result<Json<PatientModel>> {
    let ApiJson(request) = body.unwrap_or_else(|| ApiJson(OnboardRequest::default()));
    let patient = patient::onboard(&state.db, &account_id, &request.display_name).await?;
    Ok(Json(patient))
}

/// `GET /patients/me`
pub async fn me(caller: CallerPatient) -> Json<PatientModel> {
    Json(caller.patient)
}
