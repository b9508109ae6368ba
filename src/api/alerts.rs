use super::{
    AppState,
    extract::{ApiJson, ApiPath, ApiQuery, CallerPatient},
};
use crate::{
    core::alert::{self, SweepReport},
    entities::AlertModel,
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub active: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub active: bool,
}

/// `GET /alerts?active=...`
pub async fn list(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<AlertModel>>> {
    let active = match query.active.as_deref() {
        None => None,
        Some(raw) => Some(
            alert::parse_flag(raw)
                .ok_or_else(|| Error::validation(format!("invalid active filter {raw:?}")))?,
        ),
    };
    Ok(Json(alert::list_alerts(&state.db, caller.patient.id, active).await?))
}

/// `PATCH /alerts/{id}` - acknowledge or re-open.
pub async fn update(
    State(state): State<AppState>,
    caller: CallerPatient,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateAlertRequest>,
) -> Result<Json<AlertModel>> {
    let updated = alert::set_active(&state.db, caller.patient.id, id, body.active).await?;
    Ok(Json(updated))
}

/// `POST /alerts/sweep` - re-evaluates the caller's items.
pub async fn sweep(State(state): State<AppState>, caller: CallerPatient) -> Result<Json<SweepReport>> {
    Ok(Json(alert::sweep_low_stock(&state.db, Some(caller.patient.id)).await?))
}
