use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::UsageSnapshot;

pub const USAGE_API_URL: &str = "https://api.anthropic.com/api/oauth/usage";

const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const ANTHROPIC_BETA_VALUE: &str = "oauth-2025-04-20";

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint answered with a non-success status
    #[error("usage API returned status {0}")]
    Status(u16),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supplier of usage snapshots.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn fetch(&self, access_token: &str) -> Result<UsageSnapshot, FetchError>;
}

/// Client for the OAuth usage endpoint
pub struct UsageClient {
    client: reqwest::Client,
    endpoint: String,
}

impl UsageClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_endpoint(USAGE_API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("ccalert/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl UsageSource for UsageClient {
    async fn fetch(&self, access_token: &str) -> Result<UsageSnapshot, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))
                .context("Invalid token format")?,
        );
        headers.insert(
            ANTHROPIC_BETA_HEADER,
            HeaderValue::from_static(ANTHROPIC_BETA_VALUE),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ccalert/", env!("CARGO_PKG_VERSION"))),
        );

        let response = self
            .client
            .get(&self.endpoint)
            .headers(headers)
            .send()
            .await
            .context("Failed to fetch usage")?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "Usage API rejected request");
            return Err(FetchError::Status(status.as_u16()));
        }

        let snapshot = response
            .json::<UsageSnapshot>()
            .await
            .context("Failed to parse usage response")?;
        Ok(snapshot)
    }
}
