use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::alerts::state::AlertState;
use crate::credentials::{CredentialProvider, OAuthToken};

/// Tokens expiring within this many minutes are refreshed before use.
pub const REFRESH_LEAD_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Token is present and not close to expiry
    Proceed,
    /// Token is missing or expiring; try a one-shot refresh
    Refresh,
}

/// Auth health derived from the persisted `auth_error_alerted` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHealth {
    Healthy,
    AuthFailing,
}

impl AuthHealth {
    pub fn of(state: &AlertState) -> Self {
        if state.auth_error_alerted {
            AuthHealth::AuthFailing
        } else {
            AuthHealth::Healthy
        }
    }
}

pub fn decide(token: Option<&OAuthToken>, now: DateTime<Utc>) -> GateDecision {
    match token {
        None => GateDecision::Refresh,
        Some(OAuthToken {
            expires_at: Some(expires_at),
            ..
        }) if now > *expires_at - Duration::minutes(REFRESH_LEAD_MINUTES) => GateDecision::Refresh,
        Some(_) => GateDecision::Proceed,
    }
}

/// Resolve a token, refreshing at most once.
///
/// A successful refresh replaces the token with whatever a second lookup
/// returns. A failed refresh keeps the originally resolved token.
pub async fn authorize(provider: &dyn CredentialProvider, now: DateTime<Utc>) -> Option<OAuthToken> {
    let token = provider.resolve().await;

    if decide(token.as_ref(), now) == GateDecision::Proceed {
        return token;
    }

    debug!(has_token = token.is_some(), "Token missing or expiring, attempting refresh");
    if provider.refresh().await {
        provider.resolve().await
    } else {
        token
    }
}

/// Healthy -> AuthFailing. Returns `true` only on entry, which is when the
/// auth-failure alert must be sent.
pub fn record_auth_failure(state: &mut AlertState, now: DateTime<Utc>) -> bool {
    if state.auth_error_alerted {
        return false;
    }
    state.auth_error_alerted = true;
    state.last_auth_error = Some(now);
    true
}

/// AuthFailing -> Healthy after an authorized fetch. Returns `true` when a
/// transition happened. No alert is sent for recovery.
pub fn record_authorized(state: &mut AlertState) -> bool {
    if !state.auth_error_alerted {
        return false;
    }
    state.auth_error_alerted = false;
    state.last_auth_error = None;
    info!("Authorization recovered");
    true
}
