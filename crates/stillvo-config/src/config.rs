// crates/stillvo-config/src/config.rs
// ============================================================================
// Module: Stillvo Configuration
// Description: Configuration loading and validation for the digest service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Missing
//! or invalid configuration fails closed: a service without a trigger secret
//! or mail credentials refuses to start rather than running unauthenticated
//! or silently skipping sends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "stillvo.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "STILLVO_CONFIG";
/// Environment variable overriding the trigger secret.
pub const TRIGGER_SECRET_ENV_VAR: &str = "STILLVO_TRIGGER_SECRET";
/// Environment variable overriding the mail API key.
pub const MAIL_API_KEY_ENV_VAR: &str = "STILLVO_MAIL_API_KEY";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of the trigger secret.
pub(crate) const MAX_SECRET_LENGTH: usize = 256;
/// Minimum length of the trigger secret.
pub(crate) const MIN_SECRET_LENGTH: usize = 16;
/// Maximum length of the mail API key.
pub(crate) const MAX_API_KEY_LENGTH: usize = 512;
/// Maximum length of the sender address.
pub(crate) const MAX_FROM_LENGTH: usize = 320;
/// Default bind address for the trigger endpoint.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default mail API endpoint (Resend-compatible wire shape).
const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
/// Default mail request timeout in milliseconds.
const DEFAULT_MAIL_TIMEOUT_MS: u64 = 10_000;
/// Minimum allowed mail request timeout in milliseconds.
pub(crate) const MIN_MAIL_TIMEOUT_MS: u64 = 500;
/// Maximum allowed mail request timeout in milliseconds.
pub(crate) const MAX_MAIL_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level Stillvo digest service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StillvoConfig {
    /// Trigger endpoint configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Durable store configuration.
    pub store: StoreConfig,
    /// Mail transport configuration.
    pub mail: MailConfig,
}

/// Trigger endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret required by the digest trigger endpoint.
    #[serde(default)]
    pub trigger_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trigger_secret: String::new(),
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Mail transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Mail API endpoint accepting the Resend wire shape.
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,
    /// Bearer key for the mail API.
    #[serde(default)]
    pub api_key: String,
    /// Sender address used for every digest email.
    pub from: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_mail_timeout_ms")]
    pub request_timeout_ms: u64,
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl StillvoConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Path resolution: explicit argument, then the `STILLVO_CONFIG`
    /// environment variable, then `stillvo.toml` in the working directory.
    /// Secret overrides from `STILLVO_TRIGGER_SECRET` and
    /// `STILLVO_MAIL_API_KEY` are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies environment-variable secret overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var(TRIGGER_SECRET_ENV_VAR)
            && !secret.is_empty()
        {
            self.server.trigger_secret = secret;
        }
        if let Ok(key) = env::var(MAIL_API_KEY_ENV_VAR)
            && !key.is_empty()
        {
            self.mail.api_key = key;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.mail.validate()?;
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Validates the trigger endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".to_string()));
        }
        if self.trigger_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "server.trigger_secret is required (file or STILLVO_TRIGGER_SECRET)".to_string(),
            ));
        }
        if self.trigger_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "server.trigger_secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.trigger_secret.len() > MAX_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "server.trigger_secret exceeds {MAX_SECRET_LENGTH} bytes"
            )));
        }
        Ok(())
    }
}

impl MailConfig {
    /// Validates the mail transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::Invalid("mail.api_url must not be empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Invalid(
                "mail.api_key is required (file or STILLVO_MAIL_API_KEY)".to_string(),
            ));
        }
        if self.api_key.len() > MAX_API_KEY_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "mail.api_key exceeds {MAX_API_KEY_LENGTH} bytes"
            )));
        }
        if self.from.is_empty() || self.from.len() > MAX_FROM_LENGTH {
            return Err(ConfigError::Invalid("mail.from must be a sender address".to_string()));
        }
        if !self.from.contains('@') {
            return Err(ConfigError::Invalid("mail.from must contain '@'".to_string()));
        }
        if self.request_timeout_ms < MIN_MAIL_TIMEOUT_MS
            || self.request_timeout_ms > MAX_MAIL_TIMEOUT_MS
        {
            return Err(ConfigError::Invalid(format!(
                "mail.request_timeout_ms must be within [{MIN_MAIL_TIMEOUT_MS}, \
                 {MAX_MAIL_TIMEOUT_MS}]"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default mail API endpoint.
fn default_mail_api_url() -> String {
    DEFAULT_MAIL_API_URL.to_string()
}

/// Default mail request timeout.
const fn default_mail_timeout_ms() -> u64 {
    DEFAULT_MAIL_TIMEOUT_MS
}

/// Resolves the config path: explicit argument, env var, then default name.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(explicit) = path {
        return explicit.to_path_buf();
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR)
        && !from_env.is_empty()
    {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}
