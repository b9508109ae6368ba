//! HTTP transport over the core operations.
//!
//! Handlers stay thin: extract the caller, call one core function, map the
//! result. Authenticated routes resolve the caller through [`extract::CallerPatient`];
//! the two `/public/kits` routes use [`extract::AnonymousCaller`] and their own
//! quota.

pub mod error;
pub mod extract;
pub mod rate_limit;

mod alerts;
mod health;
mod kits;
mod patients;
mod public;
mod supplies;

use crate::config::AppConfig;
use axum::{
    Router,
    routing::{get, patch, post},
};
use rate_limit::{InMemoryRateLimiter, RateLimiterEngine};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub db: DatabaseConnection,
    /// Loaded settings
    pub config: Arc<AppConfig>,
    /// Quota for anonymous callers of the public kit routes
    pub public_limiter: Arc<dyn RateLimiterEngine>,
    /// Quota for authenticated callers
    pub api_limiter: Arc<dyn RateLimiterEngine>,
}

impl AppState {
    /// State with in-process rate limiters.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            public_limiter: Arc::new(InMemoryRateLimiter::new()),
            api_limiter: Arc::new(InMemoryRateLimiter::new()),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/patients", post(patients::onboard))
        .route("/patients/me", get(patients::me))
        .route("/supplies", post(supplies::create).get(supplies::list))
        .route(
            "/supplies/:id",
            get(supplies::get)
                .patch(supplies::update)
                .delete(supplies::delete),
        )
        .route(
            "/supplies/:id/movements",
            post(supplies::create_movement).get(supplies::list_movements),
        )
        .route("/alerts", get(alerts::list))
        .route("/alerts/sweep", post(alerts::sweep))
        .route("/alerts/:id", patch(alerts::update))
        .route("/kits", post(kits::create).get(kits::list))
        .route(
            "/kits/:id",
            get(kits::get).patch(kits::update).delete(kits::delete),
        )
        .route("/kits/:id/elements", post(kits::replace_elements))
        .route("/kits/:id/rotate_token", post(kits::rotate_token))
        .route("/kits/:id/verifications", get(kits::verifications))
        .route("/kits/:id/verify", post(kits::verify))
        .route("/kits/:id/qr", get(kits::qr))
        .route("/public/kits/:token", get(public::fetch))
        .route("/public/kits/:token/verify", post(public::verify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
