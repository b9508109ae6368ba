//! Service settings loaded from `diaflow.toml`.
//!
//! Every field has a default so the file is optional. A handful of
//! deployment-specific values can be overridden from the environment
//! (`DATABASE_URL`, `HOST`, `PORT`, `PUBLIC_BASE_URL`), which is also where
//! `.env` values end up after `dotenvy` runs.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{net::IpAddr, path::Path};
use tracing::{debug, info};

/// Default settings file name, overridable with `DIAFLOW_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "diaflow.toml";

/// Whole settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings
    pub server: ServerConfig,
    /// Storage settings
    pub database: DatabaseConfig,
    /// Public (no-login) kit surface settings
    pub public: PublicConfig,
    /// Per-caller request quotas
    pub rate_limits: RateLimitConfig,
    /// Periodic low-stock sweep
    pub sweep: SweepConfig,
}

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` or `PostgreSQL` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://diaflow.sqlite?mode=rwc".to_string(),
        }
    }
}

/// Public kit surface settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublicConfig {
    /// Externally reachable origin used to build the URL encoded in QR codes
    pub base_url: String,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Request quotas, per one-minute window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Anonymous callers of the public kit endpoints
    pub public_per_minute: u32,
    /// Authenticated callers of everything else
    pub api_per_minute: u32,
    /// Reverse proxies whose `X-Forwarded-For` header is believed; empty
    /// means anonymous callers are always keyed by their peer address
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            public_per_minute: 10,
            api_per_minute: 120,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Periodic low-stock sweep
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between sweeps; disabled when absent
    pub interval_secs: Option<u64>,
}

impl AppConfig {
    /// Parses settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    /// Loads settings from a file, falling back to defaults when it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            info!(path = %path_ref.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        debug!(path = %path_ref.display(), "Loading settings");
        let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {}: {e}", path_ref.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Applies overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|e| Error::Config {
                message: format!("Invalid PORT {port:?}: {e}"),
            })?;
        }
        if let Some(base_url) = lookup("PUBLIC_BASE_URL") {
            self.public.base_url = base_url;
        }
        Ok(())
    }
}

/// Loads the settings file named by `DIAFLOW_CONFIG` (or the default path)
/// and applies environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("DIAFLOW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = AppConfig::load(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Settings loaded"
    );
    Ok(config)
}
