use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PROCESSOR_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
const DEFAULT_PROCESSOR_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Processor REST API root, e.g. `https://api-m.paypal.com`
    #[validate(url)]
    pub processor_base_url: String,

    /// Bearer token for processor calls
    #[serde(default)]
    pub processor_access_token: String,

    /// Per-request processor timeout (milliseconds)
    #[serde(default = "default_processor_timeout_ms")]
    #[validate(range(min = 100, max = 120000))]
    pub processor_timeout_ms: u64,

    /// Shared secret for webhook signatures; unsigned webhooks are accepted when unset
    #[serde(default)]
    pub webhook_secret: Option<String>,

    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,

    /// Where the processor sends the buyer after vaulting a wallet
    #[validate(url)]
    pub vault_return_url: String,

    #[validate(url)]
    pub vault_cancel_url: String,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(processor_base_url: String, processor_access_token: String, environment: String) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            processor_base_url,
            processor_access_token,
            processor_timeout_ms: default_processor_timeout_ms(),
            webhook_secret: None,
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
            vault_return_url: "http://localhost:8080/vault/return".to_string(),
            vault_cancel_url: "http://localhost:8080/vault/cancel".to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn processor_timeout(&self) -> Duration {
        Duration::from_millis(self.processor_timeout_ms)
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_production() && self.processor_access_token.trim().is_empty() {
            let mut err = ValidationError::new("processor_access_token_required");
            err.message = Some("Set APP__PROCESSOR_ACCESS_TOKEN outside development".into());
            errors.add("processor_access_token", err);
        }

        if self.is_production()
            && self
                .webhook_secret
                .as_deref()
                .map_or(true, |secret| secret.trim().is_empty())
        {
            let mut err = ValidationError::new("webhook_secret_required");
            err.message = Some("Set APP__WEBHOOK_SECRET so webhook signatures are verified".into());
            errors.add("webhook_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_processor_timeout_ms() -> u64 {
    DEFAULT_PROCESSOR_TIMEOUT_MS
}

fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("gateway_bridge={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("processor_base_url", DEFAULT_PROCESSOR_BASE_URL)?
        .set_default("processor_timeout_ms", DEFAULT_PROCESSOR_TIMEOUT_MS)?
        .set_default("webhook_tolerance_secs", DEFAULT_WEBHOOK_TOLERANCE_SECS)?
        .set_default("vault_return_url", "http://localhost:8080/vault/return")?
        .set_default("vault_cancel_url", "http://localhost:8080/vault/cancel")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "https://api-m.sandbox.paypal.com".into(),
            "A21AAExampleToken".into(),
            "production".into(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.processor_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.webhook_tolerance_secs, 300);
    }

    #[test]
    fn production_requires_webhook_secret() {
        let mut cfg = base_config();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("webhook_secret"));

        cfg.webhook_secret = Some("whsec_live".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_missing_secrets() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.processor_access_token.clear();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = base_config();
        cfg.log_level = "loud".into();
        cfg.processor_base_url = "not a url".into();
        cfg.processor_timeout_ms = 5;

        let errors = cfg.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("log_level"));
        assert!(fields.contains_key("processor_base_url"));
        assert!(fields.contains_key("processor_timeout_ms"));
    }
}
