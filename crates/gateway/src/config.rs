//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GATEWAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed with `GATEWAY_STORAGE=memory`)
//! - `GATEWAY_BOT_API_KEY` - Shared key the chat bot presents (min 32 chars,
//!   high entropy)
//!
//! ## Optional
//! - `GATEWAY_HOST` - Bind address (default: 127.0.0.1)
//! - `GATEWAY_PORT` - Listen port (default: 8000)
//! - `GATEWAY_STORAGE` - `postgres` (default) or `memory`
//! - `REPORT_STALENESS_DAYS` - Max age of a cached report (default: 30)
//! - `TELEGRAM_BOT_TOKEN` + `TELEGRAM_ADMIN_ID` - Admin chat for order
//!   notifications; both or neither
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use crate::services::reports::DEFAULT_STALENESS_DAYS;

const MIN_API_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a template value, matched case-insensitively.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),
    #[error("{0} is invalid: {1}")]
    InvalidEnvVar(String, String),
    #[error("{0} is not a safe key: {1}")]
    InsecureSecret(String, String),
}

/// Where orders are persisted.
#[derive(Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL.
    Postgres(SecretString),
    /// Process-local maps; nothing survives a restart.
    Memory,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.write_str("Postgres([REDACTED])"),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Telegram admin chat that receives order notifications.
#[derive(Clone)]
pub struct AdminChatConfig {
    /// Bot API token used to send messages.
    pub bot_token: SecretString,
    /// Chat ID of the shop administrator.
    pub admin_chat_id: i64,
}

impl std::fmt::Debug for AdminChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminChatConfig")
            .field("bot_token", &"[REDACTED]")
            .field("admin_chat_id", &self.admin_chat_id)
            .finish()
    }
}

/// Gateway application configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Order store backend
    pub storage: StorageConfig,
    pub host: IpAddr,
    pub port: u16,
    /// Key the chat bot sends as its bearer token
    pub bot_api_key: SecretString,
    /// A cached report older than this many days is regenerated
    pub report_staleness_days: i64,
    /// Admin chat for order notifications
    pub admin_chat: Option<AdminChatConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("storage", &self.storage)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bot_api_key", &"[REDACTED]")
            .field("report_staleness_days", &self.report_staleness_days)
            .field("admin_chat", &self.admin_chat)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl GatewayConfig {
    /// Read the environment, after loading `.env` when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or malformed variable, or a bot
    /// key too weak to trust.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let storage = match env_or("GATEWAY_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres(database_url()?),
            "memory" => StorageConfig::Memory,
            other => {
                return Err(invalid(
                    "GATEWAY_STORAGE",
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host: IpAddr = env_or("GATEWAY_HOST", "127.0.0.1")
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("GATEWAY_HOST", e.to_string()))?;
        let port: u16 = env_or("GATEWAY_PORT", "8000")
            .parse()
            .map_err(|e: std::num::ParseIntError| invalid("GATEWAY_PORT", e.to_string()))?;

        let bot_api_key = bot_api_key()?;
        let report_staleness_days = match env_var("REPORT_STALENESS_DAYS") {
            Some(value) => parse_staleness(&value)?,
            None => DEFAULT_STALENESS_DAYS,
        };
        let admin_chat = AdminChatConfig::from_env()?;

        Ok(Self {
            storage,
            host,
            port,
            bot_api_key,
            report_staleness_days,
            admin_chat,
            sentry_dsn: env_var("SENTRY_DSN"),
            sentry_environment: env_var("SENTRY_ENVIRONMENT"),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for tests and local tooling: in-memory storage, no
    /// notifications, no Sentry.
    #[must_use]
    pub fn for_memory(bot_api_key: &str) -> Self {
        Self {
            storage: StorageConfig::Memory,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            bot_api_key: SecretString::from(bot_api_key),
            report_staleness_days: DEFAULT_STALENESS_DAYS,
            admin_chat: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl AdminChatConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (env_var("TELEGRAM_BOT_TOKEN"), env_var("TELEGRAM_ADMIN_ID")) {
            (Some(token), Some(admin_id)) => {
                let admin_chat_id = admin_id
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| invalid("TELEGRAM_ADMIN_ID", e.to_string()))?;
                Ok(Some(Self {
                    bot_token: SecretString::from(token),
                    admin_chat_id,
                }))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("TELEGRAM_ADMIN_ID".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string())),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.into())
}

/// `GATEWAY_DATABASE_URL`, then the generic `DATABASE_URL`.
fn database_url() -> Result<SecretString, ConfigError> {
    env_var("GATEWAY_DATABASE_URL")
        .or_else(|| env_var("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_DATABASE_URL".to_string()))
}

fn parse_staleness(value: &str) -> Result<i64, ConfigError> {
    let days: i64 = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid("REPORT_STALENESS_DAYS", e.to_string()))?;
    if days <= 0 {
        return Err(invalid(
            "REPORT_STALENESS_DAYS",
            format!("must be positive (got {days})"),
        ));
    }
    Ok(days)
}

/// Bits of Shannon entropy per character.
fn entropy_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject bot keys that are short, look like a template value or repeat a
/// few characters.
fn check_bot_key(key: &str, value: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| -> Result<(), ConfigError> {
        Err(ConfigError::InsecureSecret(key.to_string(), reason))
    };

    let len = value.chars().count();
    if len < MIN_API_KEY_LENGTH {
        return insecure(format!(
            "must be at least {MIN_API_KEY_LENGTH} characters (got {len})"
        ));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return insecure(format!("looks like a placeholder ('{pattern}')"));
    }

    let entropy = entropy_per_char(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy {entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}; generate a random key"
        ));
    }
    Ok(())
}

fn bot_api_key() -> Result<SecretString, ConfigError> {
    const KEY: &str = "GATEWAY_BOT_API_KEY";
    let value = env_var(KEY).ok_or_else(|| ConfigError::MissingEnvVar(KEY.to_string()))?;
    check_bot_key(KEY, &value)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    #[test]
    fn test_entropy_per_char() {
        assert!(entropy_per_char("").abs() < f64::EPSILON);
        assert!((entropy_per_char("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_bot_key_checks() {
        assert!(check_bot_key("K", GOOD_KEY).is_ok());

        for weak in ["short", "changeme-changeme-changeme-changeme", &"ab".repeat(20)] {
            let err = check_bot_key("K", weak).unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{weak}");
        }
    }

    #[test]
    fn test_parse_staleness() {
        assert_eq!(parse_staleness("30").unwrap(), 30);
        assert_eq!(parse_staleness(" 7 ").unwrap(), 7);
        assert!(parse_staleness("0").is_err());
        assert!(parse_staleness("-3").is_err());
        assert!(parse_staleness("month").is_err());
    }

    #[test]
    fn test_memory_config_binds_locally() {
        let addr = GatewayConfig::for_memory(GOOD_KEY).socket_addr();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 8000)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = GatewayConfig::for_memory("super_secret_bot_key");
        config.storage = StorageConfig::Postgres(SecretString::from("postgres://u:pw@db/petal"));
        config.admin_chat = Some(AdminChatConfig {
            bot_token: SecretString::from("123:telegram_token"),
            admin_chat_id: 42,
        });

        let shown = format!("{config:?}");
        assert!(shown.contains("[REDACTED]"));
        assert!(shown.contains("42"));
        assert!(!shown.contains("super_secret_bot_key"));
        assert!(!shown.contains("telegram_token"));
        assert!(!shown.contains("pw@db"));
    }
}
