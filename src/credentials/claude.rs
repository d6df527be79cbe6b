use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CredentialProvider, OAuthToken};

pub const DEFAULT_KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

const KEYCHAIN_TIMEOUT: Duration = Duration::from_secs(5);
const REFRESH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredentials {
    claude_ai_oauth: Option<StoredOAuth>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredOAuth {
    access_token: Option<String>,
    /// Epoch milliseconds
    expires_at: Option<i64>,
}

/// Parse a Claude credentials document (keychain secret or credentials file)
pub fn parse_credentials_json(json_str: &str) -> Result<OAuthToken> {
    let creds: StoredCredentials =
        serde_json::from_str(json_str.trim()).context("Failed to parse credentials JSON")?;

    let oauth = creds
        .claude_ai_oauth
        .context("No OAuth credentials found in credentials")?;
    let access_token = oauth
        .access_token
        .filter(|token| !token.is_empty())
        .context("OAuth credentials have no access token")?;

    Ok(OAuthToken {
        access_token,
        expires_at: oauth.expires_at.and_then(DateTime::from_timestamp_millis),
    })
}

/// Reads the Claude CLI's OAuth credentials.
///
/// On macOS the login keychain is consulted first; the credential files are
/// tried in order after that. Refreshing runs a minimal `claude` prompt, which
/// makes the CLI renew its own stored token.
#[derive(Debug, Clone)]
pub struct ClaudeCredentials {
    keychain_service: String,
    credential_files: Vec<PathBuf>,
    refresh_enabled: bool,
    use_keychain: bool,
}

impl ClaudeCredentials {
    pub fn new(keychain_service: impl Into<String>, refresh_enabled: bool) -> Self {
        Self {
            keychain_service: keychain_service.into(),
            credential_files: default_credential_files(),
            refresh_enabled,
            use_keychain: cfg!(target_os = "macos"),
        }
    }

    /// Only consult the given files, never the keychain
    pub fn from_files(credential_files: Vec<PathBuf>, refresh_enabled: bool) -> Self {
        Self {
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            credential_files,
            refresh_enabled,
            use_keychain: false,
        }
    }

    pub fn keychain_service(&self) -> &str {
        &self.keychain_service
    }

    async fn keychain_token(&self) -> Result<OAuthToken> {
        let output = tokio::time::timeout(
            KEYCHAIN_TIMEOUT,
            Command::new("security")
                .args(["find-generic-password", "-s", &self.keychain_service, "-w"])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .context("Keychain lookup timed out")?
        .context("Failed to execute security command")?;

        if !output.status.success() {
            anyhow::bail!("Keychain item '{}' not found", self.keychain_service);
        }

        let secret = String::from_utf8(output.stdout).context("Invalid UTF-8 in keychain data")?;
        parse_credentials_json(&secret)
    }

    async fn file_token(&self) -> Option<OAuthToken> {
        for path in &self.credential_files {
            let contents = match tokio::fs::read_to_string(path).await {
                Ok(contents) => contents,
                Err(_) => continue,
            };
            match parse_credentials_json(&contents) {
                Ok(token) => {
                    debug!(path = %path.display(), "Using credentials file");
                    return Some(token);
                }
                Err(e) => debug!(path = %path.display(), "Skipping credentials file: {e:#}"),
            }
        }
        None
    }
}

#[async_trait]
impl CredentialProvider for ClaudeCredentials {
    async fn resolve(&self) -> Option<OAuthToken> {
        if self.use_keychain {
            match self.keychain_token().await {
                Ok(token) => return Some(token),
                Err(e) => debug!("Keychain lookup failed: {e:#}"),
            }
        }
        self.file_token().await
    }

    async fn refresh(&self) -> bool {
        if !self.refresh_enabled {
            return false;
        }

        match run_refresh_prompt().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Token refresh failed: {e:#}");
                false
            }
        }
    }
}

async fn run_refresh_prompt() -> Result<()> {
    let mut child = Command::new("claude")
        .args(["--print", "--max-turns", "1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("Failed to start claude CLI")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(b"hi\n")
            .await
            .context("Failed to write refresh prompt")?;
    }

    let output = tokio::time::timeout(REFRESH_TIMEOUT, child.wait_with_output())
        .await
        .context("claude CLI timed out")?
        .context("Failed to wait for claude CLI")?;

    if !output.status.success() {
        anyhow::bail!("claude CLI exited with {}", output.status);
    }
    Ok(())
}

fn default_credential_files() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    vec![
        home.join(".config").join("claude").join("credentials.json"),
        home.join(".claude").join("credentials.json"),
        home.join(".claude").join(".credentials.json"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const CREDENTIALS: &str = r#"{
        "claudeAiOauth": {
            "accessToken": "test-token-123",
            "refreshToken": "refresh-456",
            "expiresAt": 1748779200000
        }
    }"#;

    #[test]
    fn test_parse_credentials_json() {
        let token = parse_credentials_json(CREDENTIALS).unwrap();
        assert_eq!(token.access_token, "test-token-123");
        assert_eq!(
            token.expires_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_credentials_json_missing_oauth() {
        assert!(parse_credentials_json("{}").is_err());
        assert!(parse_credentials_json(r#"{"claudeAiOauth": {}}"#).is_err());
        assert!(parse_credentials_json(r#"{"claudeAiOauth": {"accessToken": ""}}"#).is_err());
        assert!(parse_credentials_json("not json").is_err());
    }

    #[test]
    fn test_parse_credentials_without_expiry() {
        let token = parse_credentials_json(r#"{"claudeAiOauth": {"accessToken": "abc"}}"#).unwrap();
        assert_eq!(token, OAuthToken::new("abc"));
    }

    #[test]
    fn test_default_credential_files_under_home() {
        let files = default_credential_files();
        assert!(files.iter().all(|p| p.to_string_lossy().contains("credentials.json")));
    }

    #[tokio::test]
    async fn test_resolve_from_first_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.json");
        let valid = temp_dir.path().join("valid.json");
        std::fs::write(&broken, "{ not json").unwrap();
        std::fs::write(&valid, CREDENTIALS).unwrap();

        let provider = ClaudeCredentials::from_files(
            vec![temp_dir.path().join("missing.json"), broken, valid],
            false,
        );

        let token = provider.resolve().await.unwrap();
        assert_eq!(token.access_token, "test-token-123");
    }

    #[tokio::test]
    async fn test_resolve_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let provider = ClaudeCredentials::from_files(vec![temp_dir.path().join("none.json")], false);
        assert!(provider.resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_disabled() {
        let provider = ClaudeCredentials::from_files(Vec::new(), false);
        assert!(!provider.refresh().await);
    }
}
