use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alerts::auth_gate;
use crate::alerts::notifications::Notifier;
use crate::alerts::state::AlertState;
use crate::alerts::thresholds::{AUTH_FAILED_MESSAGE, Thresholds, WindowKind};
use crate::alerts::tracker::{Evaluation, evaluate};
use crate::credentials::CredentialProvider;
use crate::storage::StateStore;
use crate::usage::{FetchError, UsageSource};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("No OAuth token found")]
    NoToken,
    #[error("API error")]
    Upstream { status: u16 },
    #[error("{0:#}")]
    Unexpected(anyhow::Error),
}

impl From<anyhow::Error> for CycleError {
    fn from(err: anyhow::Error) -> Self {
        CycleError::Unexpected(err)
    }
}

impl CycleError {
    /// HTTP-style status of the failure
    pub fn status_code(&self) -> u16 {
        match self {
            CycleError::NoToken => 401,
            CycleError::Upstream { status } => *status,
            CycleError::Unexpected(_) => 500,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.to_string(),
            status: self.status_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub status: u16,
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub checked: bool,
    pub five_hour_percent: i64,
    pub weekly_percent: i64,
    pub alerts_triggered: usize,
    pub alerts_sent: usize,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// One load -> authorize -> fetch -> evaluate -> save -> deliver pass.
pub struct AlertCycle<'a> {
    pub credentials: &'a dyn CredentialProvider,
    pub usage: &'a dyn UsageSource,
    pub store: &'a dyn StateStore,
    pub notifier: &'a dyn Notifier,
    pub thresholds: &'a Thresholds,
    pub timezone: Tz,
}

impl AlertCycle<'_> {
    pub async fn run(&self, now: DateTime<Utc>) -> Result<CheckReport, CycleError> {
        let mut state = self.store.load();
        debug!(auth = ?auth_gate::AuthHealth::of(&state), "Loaded alert state");

        let Some(token) = auth_gate::authorize(self.credentials, now).await else {
            return Err(self.fail_auth(state, now).await);
        };

        let snapshot = match self.usage.fetch(&token.access_token).await {
            Ok(snapshot) => snapshot,
            Err(FetchError::Status(status)) => {
                warn!(status, "Usage API returned an error");
                return Err(CycleError::Upstream { status });
            }
            Err(FetchError::Other(e)) => return Err(CycleError::Unexpected(e)),
        };

        auth_gate::record_authorized(&mut state);

        let readings = snapshot.readings()?;
        let Evaluation {
            mut next_state,
            due_alerts,
        } = evaluate(&state, &readings, self.thresholds);
        next_state.last_check = Some(now);
        self.store.save(&next_state)?;

        let mut alerts_sent = 0;
        for alert in &due_alerts {
            info!(window = %alert.kind, threshold = alert.threshold, percent = alert.percent_used, "Threshold crossed");
            if self.notifier.deliver(&alert.message(now, self.timezone)).await {
                alerts_sent += 1;
            } else {
                warn!(window = %alert.kind, threshold = alert.threshold, "Alert delivery failed");
            }
        }

        debug!(triggered = due_alerts.len(), sent = alerts_sent, "Cycle complete");
        Ok(CheckReport {
            checked: true,
            five_hour_percent: snapshot.percent(WindowKind::FiveHour) as i64,
            weekly_percent: snapshot.percent(WindowKind::Weekly) as i64,
            alerts_triggered: due_alerts.len(),
            alerts_sent,
            timestamp: now.timestamp_millis(),
        })
    }

    async fn fail_auth(&self, mut state: AlertState, now: DateTime<Utc>) -> CycleError {
        if !auth_gate::record_auth_failure(&mut state, now) {
            debug!("Auth still failing, alert already sent");
            return CycleError::NoToken;
        }

        warn!("No usable OAuth token, sending auth failure alert");
        if !self.notifier.deliver(AUTH_FAILED_MESSAGE).await {
            warn!("Auth failure alert delivery failed");
        }
        if let Err(e) = self.store.save(&state) {
            return CycleError::Unexpected(e);
        }
        CycleError::NoToken
    }
}
