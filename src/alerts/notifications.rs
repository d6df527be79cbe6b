use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::usage::client::HTTP_TIMEOUT;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub const TEST_MESSAGE: &str = "✅ <b>ccalert test</b>\n\nNotifications are working. You'll receive alerts when usage thresholds are crossed.";

/// Outbound alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. Returns whether it was accepted.
    async fn deliver(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramTarget {
    pub bot_token: String,
    pub chat_id: String,
    pub topic_id: Option<i64>,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct TelegramPayload<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    text: &'a str,
    parse_mode: &'static str,
}

/// Webhook first, Telegram Bot API as the fallback.
pub struct NotificationDispatcher {
    client: reqwest::Client,
    webhook_url: Option<String>,
    telegram: Option<TelegramTarget>,
    telegram_api_base: String,
}

impl NotificationDispatcher {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let telegram = match (&config.telegram_bot_token, &config.alert_chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramTarget {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
                topic_id: config.alert_topic_id,
            }),
            _ => None,
        };

        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            telegram,
            telegram_api_base: TELEGRAM_API_BASE.to_string(),
        })
    }

    pub fn with_telegram_api_base(mut self, base: impl Into<String>) -> Self {
        self.telegram_api_base = base.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some() || self.telegram.is_some()
    }

    async fn post_webhook(&self, url: &str, message: &str) -> Result<bool> {
        let response = self
            .client
            .post(url)
            .json(&WebhookPayload { text: message })
            .send()
            .await
            .context("Failed to call webhook")?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Webhook rejected message");
        }
        Ok(response.status().is_success())
    }

    async fn post_telegram(&self, target: &TelegramTarget, message: &str) -> Result<bool> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.telegram_api_base.trim_end_matches('/'),
            target.bot_token
        );
        let response = self
            .client
            .post(url)
            .json(&TelegramPayload {
                chat_id: &target.chat_id,
                message_thread_id: target.topic_id,
                text: message,
                parse_mode: "HTML",
            })
            .send()
            .await
            .context("Failed to call Telegram API")?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Telegram rejected message");
        }
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn deliver(&self, message: &str) -> bool {
        if let Some(url) = &self.webhook_url {
            match self.post_webhook(url, message).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => warn!("{e:#}"),
            }
        }

        let Some(target) = &self.telegram else {
            debug!("No Telegram target configured");
            return false;
        };

        match self.post_telegram(target, message).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("{e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(webhook_url: Option<String>, telegram: bool) -> NotificationConfig {
        NotificationConfig {
            webhook_url,
            telegram_bot_token: telegram.then(|| "123:abc".to_string()),
            alert_chat_id: telegram.then(|| "-1001".to_string()),
            alert_topic_id: telegram.then_some(7),
        }
    }

    #[tokio::test]
    async fn test_webhook_delivery() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(serde_json::json!({"text": "hello"})))
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = NotificationDispatcher::new(&config(Some(format!("{}/hook", server.url())), false))
            .unwrap();

        assert!(dispatcher.deliver("hello").await);
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_webhook_falls_back_to_telegram() {
        let mut server = mockito::Server::new_async().await;
        let hook = server.mock("POST", "/hook").with_status(500).create_async().await;
        let telegram = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "-1001",
                "message_thread_id": 7,
                "text": "<b>hi</b>",
                "parse_mode": "HTML"
            })))
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = NotificationDispatcher::new(&config(Some(format!("{}/hook", server.url())), true))
            .unwrap()
            .with_telegram_api_base(server.url());

        assert!(dispatcher.deliver("<b>hi</b>").await);
        hook.assert_async().await;
        telegram.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_only_delivery_failure() {
        let mut server = mockito::Server::new_async().await;
        let _telegram = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(400)
            .create_async()
            .await;

        let dispatcher = NotificationDispatcher::new(&config(None, true))
            .unwrap()
            .with_telegram_api_base(server.url());

        assert!(!dispatcher.deliver("hi").await);
    }

    #[tokio::test]
    async fn test_unconfigured_dispatcher_reports_failure() {
        let dispatcher = NotificationDispatcher::new(&NotificationConfig::default()).unwrap();
        assert!(!dispatcher.is_configured());
        assert!(!dispatcher.deliver("hi").await);
    }

    #[test]
    fn test_telegram_requires_chat_id() {
        let mut settings = config(None, true);
        settings.alert_chat_id = None;
        let dispatcher = NotificationDispatcher::new(&settings).unwrap();
        assert!(!dispatcher.is_configured());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_not_fatal() {
        let dispatcher = NotificationDispatcher::new(&config(Some("http://127.0.0.1:9/hook".to_string()), false))
            .unwrap();
        assert!(!dispatcher.deliver("hi").await);
    }
}
