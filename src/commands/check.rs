use chrono::Utc;

use crate::alerts::{AlertCycle, CheckReport, CycleError};
use crate::commands::{build_credentials, build_dispatcher, build_store, display_timezone, exit_with_error};
use crate::config::Config;
use crate::usage::UsageClient;

pub async fn handle_check_command(config: &Config, json_output: bool) {
    let timezone = display_timezone(config).unwrap_or_else(|e| {
        exit_with_error(json_output, &format!("Invalid timezone configuration: {e:#}"))
    });
    let store = build_store(config)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));
    let dispatcher = build_dispatcher(config)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));
    let usage = UsageClient::new()
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));
    let credentials = build_credentials(config);

    if !dispatcher.is_configured() {
        tracing::warn!("No notification channel configured, alerts will not be delivered");
    }

    let cycle = AlertCycle {
        credentials: &credentials,
        usage: &usage,
        store: &store,
        notifier: &dispatcher,
        thresholds: &config.thresholds,
        timezone,
    };

    match cycle.run(Utc::now()).await {
        Ok(report) => print_report(&report, json_output),
        Err(e) => print_cycle_error(&e, json_output),
    }
}

fn print_report(report: &CheckReport, json_output: bool) {
    if json_output {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with_error(true, &format!("Failed to serialize report: {e}")),
        }
    } else {
        println!(
            "5-Hour: {}%  Weekly: {}%  Alerts: {} triggered, {} sent",
            report.five_hour_percent, report.weekly_percent, report.alerts_triggered, report.alerts_sent
        );
    }
}

fn print_cycle_error(error: &CycleError, json_output: bool) -> ! {
    if json_output {
        match serde_json::to_string_pretty(&error.report()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: Failed to serialize error report: {e}"),
        }
    } else {
        eprintln!("Error: {} (status {})", error, error.status_code());
    }
    std::process::exit(1);
}
