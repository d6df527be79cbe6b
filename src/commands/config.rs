use std::path::Path;

use crate::cli::ConfigAction;
use crate::commands::exit_with_error;
use crate::config::Config;

pub fn handle_config_action(action: ConfigAction, config_path: &Path, json_output: bool) {
    match action {
        ConfigAction::Init => match Config::default().save_to(config_path) {
            Ok(()) => {
                if json_output {
                    println!(
                        "{}",
                        serde_json::json!({"status": "success", "message": "Configuration initialized successfully"})
                    );
                } else {
                    println!("Configuration initialized at: {}", config_path.display());
                }
            }
            Err(e) => exit_with_error(json_output, &format!("Failed to initialize config: {e:#}")),
        },
        ConfigAction::Show => match Config::load_from(config_path) {
            Ok(config) => {
                if json_output {
                    match serde_json::to_string_pretty(&config) {
                        Ok(json) => println!("{}", json),
                        Err(e) => exit_with_error(true, &format!("Failed to serialize config to JSON: {e}")),
                    }
                } else {
                    println!("Configuration ({})", config_path.display());
                    println!("{}", config.to_commented_toml());
                }
            }
            Err(e) => exit_with_error(json_output, &format!("Failed to load config: {e:#}")),
        },
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(config_path)
                .unwrap_or_else(|e| exit_with_error(json_output, &format!("Failed to load config: {e:#}")));

            if let Err(e) = config.set_value(&key, &value) {
                exit_with_error(json_output, &format!("Invalid configuration: {e:#}"));
            }
            if let Err(e) = config.save_to(config_path) {
                exit_with_error(json_output, &format!("Failed to save config: {e:#}"));
            }

            if json_output {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "message": format!("Configuration updated: {} = {}", key, value)
                    })
                );
            } else {
                println!("Configuration updated: {} = {}", key, value);
            }
        }
    }
}
