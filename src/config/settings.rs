use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::alerts::thresholds::{ThresholdSet, Thresholds};
use crate::credentials::claude::DEFAULT_KEYCHAIN_SERVICE;
use crate::utils::date_format::parse_timezone;

pub const ENV_WEBHOOK_URL: &str = "CLAWTROL_USAGE_WEBHOOK_URL";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_KEYCHAIN_SERVICE: &str = "CLAUDE_USAGE_KEYCHAIN_SERVICE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub notifications: NotificationConfig,
    pub thresholds: Thresholds,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Keychain item holding the CLI's OAuth credentials (macOS)
    pub keychain_service_name: Option<String>,
    /// Run a minimal `claude` prompt when the token is missing or expiring
    pub refresh_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub alert_chat_id: Option<String>,
    pub alert_topic_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub timezone: String, // e.g., "UTC", "Europe/Madrid"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keychain_service_name: None,
            refresh_enabled: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: "~/.config/ccalert/usage-alerts.json".to_string(),
        }
    }
}

impl AuthConfig {
    /// Config value, then environment, then the CLI's default service name
    pub fn keychain_service(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.keychain_service_name
            .clone()
            .or_else(|| non_empty(env(ENV_KEYCHAIN_SERVICE)))
            .unwrap_or_else(|| DEFAULT_KEYCHAIN_SERVICE.to_string())
    }
}

impl NotificationConfig {
    /// Fill unset webhook URL and bot token from the environment
    pub fn with_env_fallback(&self, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut resolved = self.clone();
        if resolved.webhook_url.is_none() {
            resolved.webhook_url = non_empty(env(ENV_WEBHOOK_URL));
        }
        if resolved.telegram_bot_token.is_none() {
            resolved.telegram_bot_token = non_empty(env(ENV_TELEGRAM_BOT_TOKEN));
        }
        resolved
    }
}

/// Process environment lookup for the `*_fallback` helpers
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from `config_path`, writing a commented default file if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = self.to_commented_toml();

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Generate TOML configuration with comments explaining every option
    pub fn to_commented_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# ccalert Configuration File\n");
        output.push_str("# Claude usage threshold alerts\n");
        output.push_str("#\n");
        output.push_str("# Environment variables fill in unset values:\n");
        output.push_str(&format!("#   {}  webhook URL\n", ENV_WEBHOOK_URL));
        output.push_str(&format!("#   {}          Telegram bot token\n", ENV_TELEGRAM_BOT_TOKEN));
        output.push_str(&format!("#   {}  keychain service name\n", ENV_KEYCHAIN_SERVICE));
        output.push('\n');

        output.push_str("[auth]\n");
        output.push_str("# Keychain item holding the Claude CLI OAuth credentials (macOS only)\n");
        output.push_str(&format!("# Default: \"{}\"\n", DEFAULT_KEYCHAIN_SERVICE));
        push_optional_string(&mut output, "keychain_service_name", &self.auth.keychain_service_name);
        output.push_str("# Run `claude --print` once to renew a missing or expiring token\n");
        output.push_str(&format!("refresh_enabled = {}\n", self.auth.refresh_enabled));
        output.push('\n');

        output.push_str("[notifications]\n");
        output.push_str("# Generic webhook, receives POST {\"text\": \"...\"}. Tried first.\n");
        push_optional_string(&mut output, "webhook_url", &self.notifications.webhook_url);
        output.push_str("# Telegram Bot API fallback; needs both bot token and chat id\n");
        push_optional_string(&mut output, "telegram_bot_token", &self.notifications.telegram_bot_token);
        push_optional_string(&mut output, "alert_chat_id", &self.notifications.alert_chat_id);
        output.push_str("# Forum topic (message_thread_id) inside the chat\n");
        match self.notifications.alert_topic_id {
            Some(topic_id) => output.push_str(&format!("alert_topic_id = {}\n", topic_id)),
            None => output.push_str("# alert_topic_id = 0\n"),
        }
        output.push('\n');

        output.push_str("[thresholds]\n");
        output.push_str("# Percent breakpoints; each fires once per reset window\n");
        output.push_str(&format!("five_hour = {}\n", self.thresholds.five_hour));
        output.push_str(&format!("weekly = {}\n", self.thresholds.weekly));
        output.push('\n');

        output.push_str("[display]\n");
        output.push_str("# Timezone for reset times in alert messages\n");
        output.push_str("# Examples: \"UTC\", \"Europe/Madrid\", \"America/New_York\"\n");
        output.push_str(&format!("timezone = \"{}\"\n", self.display.timezone));
        output.push('\n');

        output.push_str("[storage]\n");
        output.push_str("# Alert dedup state, rewritten after every check\n");
        output.push_str(&format!("state_file = \"{}\"\n", self.storage.state_file));
        output.push('\n');

        output.push_str("# To reset to defaults: ccalert config init\n");
        output.push_str("# To modify values:     ccalert config set thresholds.weekly 50,90,100\n");
        output.push_str("# To view current:      ccalert config show\n");

        output
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to determine home directory")?;
        Ok(home.join(".config").join("ccalert").join("config.toml"))
    }

    /// Alert state location with a leading `~/` expanded
    pub fn state_file_path(&self) -> Result<PathBuf> {
        expand_home(&self.storage.state_file)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "auth.keychain_service_name" => self.auth.keychain_service_name = optional(value),
            "auth.refresh_enabled" => {
                self.auth.refresh_enabled = value.parse()
                    .with_context(|| format!("Invalid boolean value: {}", value))?;
            }
            "notifications.webhook_url" => {
                if !value.is_empty() && !value.starts_with("http://") && !value.starts_with("https://") {
                    anyhow::bail!("Invalid webhook_url: {}. Must start with http:// or https://", value);
                }
                self.notifications.webhook_url = optional(value);
            }
            "notifications.telegram_bot_token" => self.notifications.telegram_bot_token = optional(value),
            "notifications.alert_chat_id" => self.notifications.alert_chat_id = optional(value),
            "notifications.alert_topic_id" => {
                self.notifications.alert_topic_id = match optional(value) {
                    Some(v) => Some(v.parse().with_context(|| format!("Invalid topic id: {}", v))?),
                    None => None,
                };
            }
            "thresholds.five_hour" => self.thresholds.five_hour = ThresholdSet::parse_list(value)?,
            "thresholds.weekly" => self.thresholds.weekly = ThresholdSet::parse_list(value)?,
            "display.timezone" => {
                parse_timezone(value)?;
                self.display.timezone = value.to_string();
            }
            "storage.state_file" => {
                if value.is_empty() {
                    anyhow::bail!("state_file cannot be empty");
                }
                self.storage.state_file = value.to_string();
            }
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }
        Ok(())
    }
}

fn optional(value: &str) -> Option<String> {
    non_empty(Some(value.to_string()))
}

fn push_optional_string(output: &mut String, key: &str, value: &Option<String>) {
    match value {
        Some(v) => output.push_str(&format!("{} = {}\n", key, toml_string(v))),
        None => output.push_str(&format!("# {} = \"\"\n", key)),
    }
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir().context("Failed to determine home directory")?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
