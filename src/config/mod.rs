/// Database connection and schema bootstrap
pub mod database;

/// Service settings loaded from a TOML file and the environment
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
