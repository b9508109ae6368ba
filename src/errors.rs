//! Unified error type for the service.
//!
//! Validation and not-found outcomes are expected and carry enough context for
//! the caller; storage failures are wrapped as-is and surface as a generic
//! internal failure at the HTTP boundary.

use sea_orm::DbErr;
use thiserror::Error;

/// All errors produced by the core and the API layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any state change (e.g. negative resulting stock).
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Unknown resource, resource owned by someone else, or inactive kit.
    #[error("{resource} not found")]
    NotFound {
        /// Kind of resource that was looked up
        resource: &'static str,
    },

    /// The caller exhausted its request quota for the current window.
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },

    /// No caller identity, or an identity that was never onboarded.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Settings could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// QR rendering failed.
    #[error("QR generation failed: {message}")]
    Qr {
        /// Encoder error text
        message: String,
    },

    /// Storage failure; never recovered locally.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Socket or filesystem failure outside the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] on the given resource kind.
    #[must_use]
    pub const fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
