//! Request extractors: caller identity, anonymous caller key, JSON bodies,
//! path and query parameters.
//!
//! Identity is established upstream; the gateway forwards the verified
//! account id in `X-Account-ID`. Each extractor also charges the caller's
//! request quota, so a handler that takes one is rate limited.

use super::{AppState, rate_limit};
use crate::{
    core::patient,
    entities::patient as patient_entity,
    errors::{Error, Result},
};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::net::{IpAddr, SocketAddr};

/// Header carrying the authenticated account id.
pub const ACCOUNT_HEADER: &str = "X-Account-ID";

/// Header set by proxies with the originating client address first.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// JSON body whose rejections become validation errors.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections become validation errors.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// Query string whose rejections become validation errors.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

fn account_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|csv| csv.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Rate-limit key for an anonymous caller.
///
/// `X-Forwarded-For` is honored only when the direct peer is a configured
/// proxy; anyone else is keyed by the address they connected from.
fn client_ident(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpAddr]) -> String {
    match peer {
        Some(peer) if trusted.contains(&peer) => {
            forwarded_client(headers).unwrap_or_else(|| peer.to_string())
        }
        Some(peer) => peer.to_string(),
        None => "anonymous".to_string(),
    }
}

/// Authenticated account id, not yet resolved to a patient.
#[derive(Debug, Clone)]
pub struct CallerAccount(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CallerAccount {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let account = account_from_headers(&parts.headers).ok_or(Error::Unauthenticated)?;
        rate_limit::enforce(
            state.api_limiter.as_ref(),
            &format!("account:{account}"),
            state.config.rate_limits.api_per_minute,
        )
        .await?;
        Ok(Self(account))
    }
}

/// The onboarded patient behind the caller's account.
#[derive(Debug, Clone)]
pub struct CallerPatient {
    /// Account id from the request
    pub account_id: String,
    /// Resolved patient
    pub patient: patient_entity::Model,
}

#[async_trait]
impl FromRequestParts<AppState> for CallerPatient {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CallerAccount(account_id) = CallerAccount::from_request_parts(parts, state).await?;
        let patient = patient::find_by_account(&state.db, &account_id)
            .await?
            .ok_or(Error::Unauthenticated)?;
        Ok(Self {
            account_id,
            patient,
        })
    }
}

/// Rate-limit identity of an unauthenticated caller.
#[derive(Debug, Clone)]
pub struct AnonymousCaller(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AnonymousCaller {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let ident = client_ident(
            &parts.headers,
            peer,
            &state.config.rate_limits.trusted_proxies,
        );

        rate_limit::enforce(
            state.public_limiter.as_ref(),
            &format!("public:{ident}"),
            state.config.rate_limits.public_per_minute,
        )
        .await?;
        Ok(Self(ident))
    }
}
