//! Configuration management
//!
//! Settings are read in this order of precedence:
//! 1. environment variables
//! 2. the `igr.toml` configuration file
//! 3. default values
//!
//! `${VAR_NAME}` inside the configuration file is expanded from the
//! environment before parsing.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default configuration file name
pub const CONFIG_FILE: &str = "igr.toml";

/// Instagram account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Where the session bundle is persisted between runs
    #[serde(default = "default_session_path")]
    pub session_path: String,

    /// Timeout applied to every private API request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(skip_serializing)]
    pub bot_token: String,

    /// The only Telegram user whose commands are honoured
    pub operator_id: u64,

    /// Public URL Telegram delivers updates to
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Port the webhook server listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Pacing of the poll loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between poll cycles
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Pause after every reply sent
    #[serde(default = "default_reply_delay_secs")]
    pub reply_delay_secs: u64,

    /// Pause after the provider signals rate limiting
    #[serde(default = "default_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            reply_delay_secs: default_reply_delay_secs(),
            rate_limit_cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_secs(self.reply_delay_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

/// Main configuration for igr
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instagram: InstagramConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_session_path() -> String {
    "session.json".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_webhook_url() -> String {
    "https://your-app.onrender.com/webhook".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_poll_interval_secs() -> u64 {
    8
}

fn default_reply_delay_secs() -> u64 {
    2
}

fn default_cooldown_secs() -> u64 {
    300
}

/// Read an environment variable, treating an empty value as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
fn env_parse<T: FromStr>(name: &str) -> crate::Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid value: {}", name, raw))),
        None => Ok(None),
    }
}

fn required(name: &str) -> crate::Result<String> {
    env_var(name).ok_or_else(|| Error::Config(format!("{} not set", name)))
}

impl Config {
    /// Expand `${VAR_NAME}` references from the environment.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load `igr.toml` if present, otherwise the environment alone
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from a TOML file, with environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;

        Ok(cfg)
    }

    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        let instagram = toml.instagram.unwrap_or_default();
        let telegram = toml.telegram.unwrap_or_default();
        let poll = toml.poll.unwrap_or_default();

        Ok(Config {
            instagram: InstagramConfig {
                username: instagram.username.unwrap_or_default(),
                password: instagram.password.unwrap_or_default(),
                session_path: instagram.session_path.unwrap_or_else(default_session_path),
                http_timeout_secs: instagram
                    .http_timeout_secs
                    .unwrap_or_else(default_http_timeout_secs),
            },
            telegram: TelegramConfig {
                bot_token: telegram.bot_token.unwrap_or_default(),
                operator_id: telegram.operator_id.unwrap_or_default(),
                webhook_url: telegram.webhook_url.unwrap_or_else(default_webhook_url),
                port: telegram.port.unwrap_or_else(default_port),
            },
            poll: PollConfig {
                interval_secs: poll.interval_secs.unwrap_or_else(default_poll_interval_secs),
                reply_delay_secs: poll.reply_delay_secs.unwrap_or_else(default_reply_delay_secs),
                rate_limit_cooldown_secs: poll
                    .rate_limit_cooldown_secs
                    .unwrap_or_else(default_cooldown_secs),
            },
        })
    }

    /// Override file values with any environment variables that are set
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Some(username) = env_var("INSTAGRAM_USERNAME") {
            self.instagram.username = username;
        }
        if let Some(password) = env_var("INSTAGRAM_PASSWORD") {
            self.instagram.password = password;
        }
        if let Some(path) = env_var("SESSION_PATH") {
            self.instagram.session_path = path;
        }
        if let Some(secs) = env_parse("HTTP_TIMEOUT_SECS")? {
            self.instagram.http_timeout_secs = secs;
        }

        if let Some(token) = env_var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(id) = env_parse("TELEGRAM_CHAT_ID")? {
            self.telegram.operator_id = id;
        }
        if let Some(url) = env_var("WEBHOOK_URL") {
            self.telegram.webhook_url = url;
        }
        if let Some(port) = env_parse("PORT")? {
            self.telegram.port = port;
        }

        if let Some(secs) = env_parse("POLL_INTERVAL_SECS")? {
            self.poll.interval_secs = secs;
        }
        if let Some(secs) = env_parse("REPLY_DELAY_SECS")? {
            self.poll.reply_delay_secs = secs;
        }
        if let Some(secs) = env_parse("RATE_LIMIT_COOLDOWN_SECS")? {
            self.poll.rate_limit_cooldown_secs = secs;
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let operator_id = env_parse("TELEGRAM_CHAT_ID")?
            .ok_or_else(|| Error::Config("TELEGRAM_CHAT_ID not set".to_string()))?;

        let config = Config {
            instagram: InstagramConfig {
                username: required("INSTAGRAM_USERNAME")?,
                password: required("INSTAGRAM_PASSWORD")?,
                session_path: env_var("SESSION_PATH").unwrap_or_else(default_session_path),
                http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS")?
                    .unwrap_or_else(default_http_timeout_secs),
            },
            telegram: TelegramConfig {
                bot_token: required("TELEGRAM_BOT_TOKEN")?,
                operator_id,
                webhook_url: env_var("WEBHOOK_URL").unwrap_or_else(default_webhook_url),
                port: env_parse("PORT")?.unwrap_or_else(default_port),
            },
            poll: PollConfig {
                interval_secs: env_parse("POLL_INTERVAL_SECS")?
                    .unwrap_or_else(default_poll_interval_secs),
                reply_delay_secs: env_parse("REPLY_DELAY_SECS")?
                    .unwrap_or_else(default_reply_delay_secs),
                rate_limit_cooldown_secs: env_parse("RATE_LIMIT_COOLDOWN_SECS")?
                    .unwrap_or_else(default_cooldown_secs),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations missing credentials the relay cannot run without
    pub fn validate(&self) -> crate::Result<()> {
        if self.instagram.username.trim().is_empty() {
            return Err(Error::Config("Instagram username not set".to_string()));
        }
        if self.instagram.password.is_empty() {
            return Err(Error::Config("Instagram password not set".to_string()));
        }
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::Config("Telegram bot token not set".to_string()));
        }
        if self.telegram.operator_id == 0 {
            return Err(Error::Config("Telegram operator id not set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    instagram: Option<TomlInstagramConfig>,
    telegram: Option<TomlTelegramConfig>,
    poll: Option<TomlPollConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlInstagramConfig {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    session_path: Option<String>,
    #[serde(default)]
    http_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlTelegramConfig {
    #[serde(default)]
    bot_token: Option<String>,
    #[serde(default)]
    operator_id: Option<u64>,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPollConfig {
    #[serde(default)]
    interval_secs: Option<u64>,
    #[serde(default)]
    reply_delay_secs: Option<u64>,
    #[serde(default)]
    rate_limit_cooldown_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_config_default() {
        let config = PollConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(8));
        assert_eq!(config.reply_delay(), Duration::from_secs(2));
        assert_eq!(config.rate_limit_cooldown(), Duration::from_secs(300));
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("IGR_TEST_EXPAND_VAR", "secret");
        }

        let result = Config::expand_env_vars("password = \"${IGR_TEST_EXPAND_VAR}\"");
        assert_eq!(result, "password = \"secret\"");

        let result = Config::expand_env_vars("a_${IGR_TEST_NONEXISTENT_VAR}_b");
        assert_eq!(result, "a__b");

        unsafe {
            std::env::remove_var("IGR_TEST_EXPAND_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[instagram]
username = "shop.account"
password = "hunter2"
session_path = "/var/lib/igr/session.json"

[telegram]
bot_token = "123:abc"
operator_id = 987654321
webhook_url = "https://relay.example.com/webhook"
port = 8080

[poll]
interval_secs = 15
reply_delay_secs = 3
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.instagram.username, "shop.account");
        assert_eq!(config.instagram.session_path, "/var/lib/igr/session.json");
        assert_eq!(config.instagram.http_timeout_secs, 30);
        assert_eq!(config.telegram.operator_id, 987654321);
        assert_eq!(config.telegram.port, 8080);
        assert_eq!(config.poll.interval_secs, 15);
        assert_eq!(config.poll.reply_delay_secs, 3);
        assert_eq!(config.poll.rate_limit_cooldown_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.instagram.session_path, "session.json");
        assert_eq!(
            config.telegram.webhook_url,
            "https://your-app.onrender.com/webhook"
        );
        assert_eq!(config.telegram.port, 5000);
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let config = Config::from_toml_str(
            r#"
[telegram]
bot_token = "123:abc"
operator_id = 1
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Instagram username"));
    }

    #[test]
    fn test_validate_rejects_missing_operator() {
        let config = Config::from_toml_str(
            r#"
[instagram]
username = "u"
password = "p"

[telegram]
bot_token = "123:abc"
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("operator"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[telegram\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
