use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::errors::MigrateError;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_DATABASE_URL: &str = "sqlite://shopfloor.db?mode=rwc";
const CONFIG_DIR: &str = "config";

/// Engine configuration.
///
/// Layered: built-in defaults, then `config/default.toml`, then
/// `config/{APP_ENV}.toml`, then `APP__`-prefixed environment
/// variables (e.g. `APP__DATABASE_URL`).
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// SQLite connection URL for the normalized database.
    #[serde(default = "default_database_url")]
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// JSON export of the legacy single-table order store.
    pub legacy_orders_path: Option<String>,

    /// JSON export of the legacy assembly association table.
    pub assembly_rows_path: Option<String>,

    /// JSON feed produced by the filesystem scan workers.
    pub scan_feed_path: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            legacy_orders_path: None,
            assembly_rows_path: None,
            scan_feed_path: None,
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the layered sources.
    pub fn load() -> Result<Self, MigrateError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)
            .map_err(config_err)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)
            .map_err(config_err)?;

        let default_file = Path::new(CONFIG_DIR).join("default.toml");
        if default_file.exists() {
            builder = builder.add_source(File::from(default_file));
        }
        let env_file = Path::new(CONFIG_DIR).join(format!("{env}.toml"));
        if env_file.exists() {
            builder = builder.add_source(File::from(env_file));
        }

        builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

        let config: AppConfig = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;

        config
            .validate()
            .map_err(|e| MigrateError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn config_err(e: ConfigError) -> MigrateError {
    MigrateError::Config(e.to_string())
}
