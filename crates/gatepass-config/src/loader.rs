//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator, DEFAULT_JWT_SECRET};
use config::{Config, ConfigError, Environment, File};
use gatepass_core::GatepassError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix of environment variable overrides (`GATEPASS__SECTION__KEY`).
pub const ENV_PREFIX: &str = "GATEPASS";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with the `GATEPASS__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, GatepassError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, GatepassError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), GatepassError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, GatepassError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("GATEPASS_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        Self::load_from(config_dir, &environment, Self::environment_source())
    }

    /// Builds the configuration from the files in `config_dir` plus `env_source`.
    pub(crate) fn load_from(
        config_dir: &str,
        environment: &str,
        env_source: Environment,
    ) -> Result<AppConfig, GatepassError> {
        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = format!("{config_dir}/{name}.toml");
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(env_source);

        let config = builder.build().map_err(config_error_to_gatepass_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_gatepass_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Environment overrides. Values stay strings so phone numbers such as
    /// `08` keep their leading zero.
    fn environment_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX).separator("__")
    }

    fn validate_config(config: &AppConfig) -> Result<(), GatepassError> {
        if config.app.environment == "production" && config.security.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("Using default JWT secret in production! This is a security risk.");
        }

        if config.roles.staff_phones.is_empty() && config.roles.admin_phones.is_empty() {
            warn!("No staff or admin phones configured; every registration becomes a member");
        }

        ConfigValidator::validate(config).map_err(|errors| {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            GatepassError::Configuration(message)
        })
    }

    /// Gets a specific configuration value by key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

fn config_error_to_gatepass_error(err: ConfigError) -> GatepassError {
    GatepassError::Configuration(err.to_string())
}
