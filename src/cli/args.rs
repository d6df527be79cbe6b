use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ccalert")]
#[command(about = "Claude usage threshold alerts")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON output format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize fresh configuration
    Init,
    /// Set configuration value
    Set {
        /// Configuration key (e.g., thresholds.five_hour)
        key: String,
        /// Configuration value (empty string unsets optional keys)
        value: String,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one alert cycle: fetch usage, fire due alerts, save state
    Check,

    /// Show current usage for every window
    Usage,

    /// Show persisted alert state
    Status,

    /// Forget which thresholds have already been alerted
    Reset,

    /// Send a test message through the configured channels
    #[command(name = "test-alert")]
    TestAlert,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_with_globals() {
        let cli = Cli::try_parse_from(["ccalert", "check", "--json", "--config", "/tmp/c.toml"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["ccalert", "config", "set", "thresholds.weekly", "50,90"]).unwrap();
        match cli.command {
            Some(Commands::Config { action: ConfigAction::Set { key, value } }) => {
                assert_eq!(key, "thresholds.weekly");
                assert_eq!(value, "50,90");
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn test_parse_test_alert() {
        let cli = Cli::try_parse_from(["ccalert", "test-alert"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::TestAlert)));
    }
}
