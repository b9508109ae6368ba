use super::AppState;
use crate::config::database;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub db_ok: bool,
}

/// `GET /healthz` - 200 when the database answers, 503 otherwise.
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    if database::ping(&state.db).await {
        (
            StatusCode::OK,
            Json(Health {
                status: "ok",
                db_ok: true,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Health {
                status: "degraded",
                db_ok: false,
            }),
        )
    }
}
