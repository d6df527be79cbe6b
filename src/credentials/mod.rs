// Credential lookup for the usage API
pub mod claude;

pub use claude::{ClaudeCredentials, parse_credentials_json};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// OAuth bearer token with its optional expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Source of bearer tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Look up the current token, `None` when nothing usable is stored.
    async fn resolve(&self) -> Option<OAuthToken>;

    /// Attempt a one-shot token refresh. Returns whether it succeeded.
    async fn refresh(&self) -> bool;
}
