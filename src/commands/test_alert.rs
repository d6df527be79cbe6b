use crate::alerts::Notifier;
use crate::alerts::notifications::TEST_MESSAGE;
use crate::commands::{build_dispatcher, exit_with_error};
use crate::config::Config;

pub async fn handle_test_alert_command(config: &Config, json_output: bool) {
    let dispatcher = build_dispatcher(config)
        .unwrap_or_else(|e| exit_with_error(json_output, &format!("{e:#}")));

    if !dispatcher.is_configured() {
        exit_with_error(
            json_output,
            "No notification channel configured. Set notifications.webhook_url or a Telegram bot token and chat id.",
        );
    }

    if !dispatcher.deliver(TEST_MESSAGE).await {
        exit_with_error(json_output, "Test alert was not delivered");
    }

    if json_output {
        println!(
            "{}",
            serde_json::json!({"status": "success", "message": "Test alert sent"})
        );
    } else {
        println!("Test alert sent");
    }
}
