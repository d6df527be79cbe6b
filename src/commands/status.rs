use crate::alerts::AlertState;
use crate::commands::{build_store, exit_with_error};
use crate::config::Config;
use crate::output::OutputFormat;
use crate::storage::StateStore;

pub fn handle_status_command(config: &Config, json_output: bool) {
    let store = build_store(config)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));
    let state = store.load();

    if json_output {
        match state.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with_error(true, &format!("Failed to serialize state: {e}")),
        }
    } else {
        println!("Alert state ({})", store.path().display());
        println!("{}", state.to_table());
    }
}

pub fn handle_reset_command(config: &Config, json_output: bool) {
    let store = build_store(config)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));

    if let Err(e) = store.save(&AlertState::default()) {
        exit_with_error(json_output, &format!("Failed to reset alert state: {e:#}"));
    }

    if json_output {
        println!(
            "{}",
            serde_json::json!({"status": "success", "message": "Alert state reset"})
        );
    } else {
        println!("Alert state reset: {}", store.path().display());
    }
}
