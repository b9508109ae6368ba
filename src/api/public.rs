//! No-login kit endpoints reached through the QR code.
//!
//! Both handlers take [`AnonymousCaller`] first so the quota is charged
//! before the token is looked up.

use super::{
    AppState,
    extract::{AnonymousCaller, ApiJson, ApiPath},
    kits::VerifyRequest,
};
use crate::{
    core::verification::{self, PublicKit, VerificationOutcome},
    errors::Result,
};
use axum::{Json, extract::State};
use tracing::debug;

/// `GET /public/kits/{token}`
pub async fn fetch(
    AnonymousCaller(caller): AnonymousCaller,
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<PublicKit>> {
    debug!(%caller, "Public kit fetch");
    Ok(Json(verification::public_fetch(&state.db, &token).await?))
}

/// `POST /public/kits/{token}/verify`
pub async fn verify(
    AnonymousCaller(caller): AnonymousCaller,
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<VerificationOutcome>> {
    debug!(%caller, "Public kit verification");
    Ok(Json(verification::public_verify(&state.db, &token, &body.items).await?))
}
