// ccalert: Claude usage threshold alerts
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ccalert::cli::{Cli, Commands};
use ccalert::commands::{
    exit_with_error, handle_check_command, handle_config_action, handle_reset_command,
    handle_status_command, handle_test_alert_command, handle_usage_command,
};
use ccalert::config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => Config::default_path()
            .unwrap_or_else(|e| exit_with_error(cli.json, &format!("{e:#}"))),
    };

    let json = cli.json;
    match cli.command.unwrap_or(Commands::Usage) {
        Commands::Config { action } => handle_config_action(action, &config_path, json),
        Commands::Check => handle_check_command(&load_config(&config_path, json), json).await,
        Commands::Usage => handle_usage_command(&load_config(&config_path, json), json).await,
        Commands::Status => handle_status_command(&load_config(&config_path, json), json),
        Commands::Reset => handle_reset_command(&load_config(&config_path, json), json),
        Commands::TestAlert => {
            handle_test_alert_command(&load_config(&config_path, json), json).await
        }
    }
}

fn load_config(config_path: &Path, json_output: bool) -> Config {
    Config::load_from(config_path).unwrap_or_else(|e| {
        exit_with_error(json_output, &format!("Failed to load configuration: {e:#}"))
    })
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ccalert=debug")
    } else {
        EnvFilter::new("ccalert=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
