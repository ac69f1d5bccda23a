//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TELEGRAM_BOT_TOKEN` - Telegram Bot API token
//! - `GATEWAY_BASE_URL` - Base URL of the REST gateway
//! - `GATEWAY_BOT_API_KEY` - Shared key for the gateway's bot endpoints
//!
//! ## Optional
//! - `TELEGRAM_ADMIN_ID` - Chat that hears about new registrations
//! - `GATEWAY_TIMEOUT_SECS` - Per-request gateway timeout (default: 10)
//! - `TELEGRAM_POLL_TIMEOUT_SECS` - Long-poll timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use petal_core::TelegramId;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bot application configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram Bot API token
    pub telegram_token: SecretString,
    /// Chat notified about new registrations
    pub admin_chat: Option<TelegramId>,
    /// Gateway base URL, always ending in `/`
    pub gateway_url: Url,
    /// Key presented to the gateway's bot endpoints
    pub gateway_api_key: SecretString,
    /// Timeout for a single gateway request
    pub gateway_timeout: Duration,
    /// Long-poll timeout for `getUpdates`
    pub poll_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"[REDACTED]")
            .field("admin_chat", &self.admin_chat)
            .field("gateway_url", &self.gateway_url.as_str())
            .field("gateway_api_key", &"[REDACTED]")
            .field("gateway_timeout", &self.gateway_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let admin_chat = get_optional_env("TELEGRAM_ADMIN_ID")
            .map(|raw| {
                raw.trim().parse::<TelegramId>().map_err(|e| {
                    ConfigError::InvalidEnvVar("TELEGRAM_ADMIN_ID".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            telegram_token: SecretString::from(get_required_env("TELEGRAM_BOT_TOKEN")?),
            admin_chat,
            gateway_url: parse_base_url(&get_required_env("GATEWAY_BASE_URL")?)?,
            gateway_api_key: SecretString::from(get_required_env("GATEWAY_BOT_API_KEY")?),
            gateway_timeout: get_secs("GATEWAY_TIMEOUT_SECS", 10)?,
            poll_timeout: get_secs("TELEGRAM_POLL_TIMEOUT_SECS", 30)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Parse the gateway URL so relative paths join below it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("GATEWAY_BASE_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get a positive number of seconds with a default.
fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        Ok(_) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be positive".to_string(),
        )),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}
