use chrono::Utc;

use crate::alerts::auth_gate;
use crate::commands::{build_credentials, exit_with_error};
use crate::config::Config;
use crate::output::OutputFormat;
use crate::usage::{FetchError, UsageClient, UsageSource, UsageSummary};

/// Read-only view of current usage; never touches alert state
pub async fn handle_usage_command(config: &Config, json_output: bool) {
    let credentials = build_credentials(config);
    let now = Utc::now();

    let Some(token) = auth_gate::authorize(&credentials, now).await else {
        exit_with_error(json_output, "No OAuth token found. Run `claude /login`.");
    };

    let client = UsageClient::new()
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));

    let snapshot = match client.fetch(&token.access_token).await {
        Ok(snapshot) => snapshot,
        Err(FetchError::Status(status)) => {
            exit_with_error(json_output, &format!("Usage API returned status {status}"))
        }
        Err(FetchError::Other(e)) => exit_with_error(json_output, &format!("{e:#}")),
    };

    let summary = UsageSummary::from_snapshot(&snapshot, now)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));

    if json_output {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with_error(true, &format!("Failed to serialize usage: {e}")),
        }
    } else {
        println!("{}", summary.to_table());
    }
}
