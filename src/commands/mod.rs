// Command handlers module
pub mod check;
pub mod config;
pub mod status;
pub mod test_alert;
pub mod usage;

pub use check::handle_check_command;
pub use config::handle_config_action;
pub use status::{handle_reset_command, handle_status_command};
pub use test_alert::handle_test_alert_command;
pub use usage::handle_usage_command;

use anyhow::Result;
use chrono_tz::Tz;

use crate::alerts::NotificationDispatcher;
use crate::config::{Config, process_env};
use crate::credentials::ClaudeCredentials;
use crate::storage::JsonFileStore;
use crate::utils::date_format::parse_timezone;

pub fn build_credentials(config: &Config) -> ClaudeCredentials {
    let credentials =
        ClaudeCredentials::new(config.auth.keychain_service(process_env), config.auth.refresh_enabled);
    tracing::debug!(service = credentials.keychain_service(), "Credential lookup configured");
    credentials
}

pub fn build_store(config: &Config) -> Result<JsonFileStore> {
    Ok(JsonFileStore::new(config.state_file_path()?))
}

pub fn build_dispatcher(config: &Config) -> Result<NotificationDispatcher> {
    NotificationDispatcher::new(&config.notifications.with_env_fallback(process_env))
}

pub fn display_timezone(config: &Config) -> Result<Tz> {
    parse_timezone(&config.display.timezone)
}

/// Print a failure in the selected format and exit with status 1
pub fn exit_with_error(json_output: bool, message: &str) -> ! {
    if json_output {
        println!(
            "{}",
            serde_json::json!({"status": "error", "message": message})
        );
    } else {
        eprintln!("Error: {}", message);
    }
    std::process::exit(1);
}
