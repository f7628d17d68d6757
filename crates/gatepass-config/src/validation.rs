//! Configuration validation module.
//!
//! Collects every problem in a loaded configuration instead of stopping at
//! the first one, so a misconfigured deployment fails fast with a full report.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// JWT secret is too short.
    JwtSecretTooShort { actual: usize, minimum: usize },
    /// Port number is invalid.
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A value that must be positive is zero.
    NonPositive { name: String },
    /// UTC offset is outside +/-24h.
    InvalidUtcOffset { minutes: i32 },
    /// QR URL template does not reference the user id.
    MissingQrPlaceholder,
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JwtSecretTooShort { actual, minimum } => {
                write!(f, "JWT secret too short: {actual} characters (minimum {minimum})")
            }
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {name}: {value} (must be 1-65535)")
            }
            Self::InvalidPoolSize { min, max } => {
                write!(f, "Invalid pool size: min ({min}) cannot be greater than max ({max})")
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {url_type} URL: {message}")
            }
            Self::NonPositive { name } => write!(f, "'{name}' must be positive"),
            Self::InvalidUtcOffset { minutes } => {
                write!(f, "Invalid check-in UTC offset: {minutes} minutes")
            }
            Self::MissingQrPlaceholder => {
                write!(f, "QR URL template must contain the {{id}} placeholder")
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{value}' (valid: trace, debug, info, warn, error)"
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{value}' (valid: json, pretty)")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Minimum JWT secret length for HS256.
    const MIN_JWT_SECRET_LENGTH: usize = 32;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(config, &mut errors);
        Self::validate_database(config, &mut errors);
        Self::validate_redis(config, &mut errors);
        Self::validate_security(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_registration(config, &mut errors);
        Self::validate_checkin(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.server.rest_port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "rest_port".to_string(),
                value: 0,
            });
        }
        if config.server.request_timeout_secs == 0 {
            errors.push(non_positive("server.request_timeout_secs"));
        }
    }

    fn validate_database(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let db = &config.database;
        if db.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !db.url.starts_with("postgres://") && !db.url.starts_with("postgresql://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with postgres:// or postgresql://".to_string(),
            });
        }

        if db.min_connections > db.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: db.min_connections,
                max: db.max_connections,
            });
        }
        if db.connect_timeout_secs == 0 {
            errors.push(non_positive("database.connect_timeout_secs"));
        }
    }

    fn validate_redis(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let redis = &config.redis;
        if !redis.enabled {
            return;
        }
        if !redis.url.starts_with("redis://") && !redis.url.starts_with("rediss://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        }
        if redis.pool_size == 0 {
            errors.push(non_positive("redis.pool_size"));
        }
        if redis.ttl_secs == 0 {
            errors.push(non_positive("redis.ttl_secs"));
        }
    }

    fn validate_security(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let security = &config.security;
        if security.jwt_secret.len() < Self::MIN_JWT_SECRET_LENGTH {
            errors.push(ConfigValidationError::JwtSecretTooShort {
                actual: security.jwt_secret.len(),
                minimum: Self::MIN_JWT_SECRET_LENGTH,
            });
        }
        if security.jwt_access_expiration_secs == 0 {
            errors.push(non_positive("security.jwt_access_expiration_secs"));
        }
    }

    fn validate_storage(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let storage = &config.storage;
        if let Err(e) = Url::parse(&storage.public_base_url) {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "storage.public_base_url".to_string(),
                message: e.to_string(),
            });
        }
        if let Some(endpoint) = &storage.endpoint {
            if let Err(e) = Url::parse(endpoint) {
                errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "storage.endpoint".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn validate_registration(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.registration.uid_length == 0 {
            errors.push(non_positive("registration.uid_length"));
        }
        if config.registration.uid_max_attempts == 0 {
            errors.push(non_positive("registration.uid_max_attempts"));
        }
    }

    fn validate_checkin(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let checkin = &config.checkin;
        if checkin.offset().is_none() {
            errors.push(ConfigValidationError::InvalidUtcOffset {
                minutes: checkin.utc_offset_minutes,
            });
        }
        if !checkin.qr_url_template.contains("{id}") {
            errors.push(ConfigValidationError::MissingQrPlaceholder);
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let obs = &config.observability;
        if !Self::VALID_LOG_LEVELS.contains(&obs.log_level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: obs.log_level.clone(),
            });
        }
        if !matches!(obs.log_format.as_str(), "json" | "pretty") {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: obs.log_format.clone(),
            });
        }
    }
}

fn non_positive(name: &str) -> ConfigValidationError {
    ConfigValidationError::NonPositive {
        name: name.to_string(),
    }
}
