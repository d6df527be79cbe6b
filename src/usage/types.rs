use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::thresholds::WindowKind;
use crate::alerts::tracker::{Readings, UsageReading};

/// One window as reported by the usage API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageWindowApi {
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub resets_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraUsageApi {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub monthly_limit: Option<f64>,
    #[serde(default)]
    pub used_credits: Option<f64>,
    #[serde(default)]
    pub utilization: Option<f64>,
}

/// Usage API response (snake_case on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(default)]
    pub five_hour: Option<UsageWindowApi>,
    #[serde(default)]
    pub seven_day: Option<UsageWindowApi>,
    #[serde(default)]
    pub seven_day_opus: Option<UsageWindowApi>,
    #[serde(default)]
    pub seven_day_sonnet: Option<UsageWindowApi>,
    #[serde(default)]
    pub extra_usage: Option<ExtraUsageApi>,
}

impl UsageWindowApi {
    pub fn percent(&self) -> f64 {
        round_percent(self.utilization.unwrap_or(0.0))
    }

    pub fn reset_at(&self) -> Result<Option<DateTime<Utc>>> {
        match self.resets_at.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_reset_timestamp(raw).map(Some),
        }
    }

    pub fn reading(&self) -> Result<UsageReading> {
        Ok(UsageReading {
            percent_used: self.percent(),
            reset_at: self.reset_at()?,
        })
    }
}

impl UsageSnapshot {
    pub fn window(&self, kind: WindowKind) -> Option<&UsageWindowApi> {
        match kind {
            WindowKind::FiveHour => self.five_hour.as_ref(),
            WindowKind::Weekly => self.seven_day.as_ref(),
        }
    }

    /// Rounded percent of a window, 0 when the API omitted it
    pub fn percent(&self, kind: WindowKind) -> f64 {
        self.window(kind).map(UsageWindowApi::percent).unwrap_or(0.0)
    }

    /// Tracker input for the alerted windows present in this snapshot
    pub fn readings(&self) -> Result<Readings> {
        let mut readings = Readings::new();
        for kind in WindowKind::ALL {
            if let Some(window) = self.window(kind) {
                let reading = window
                    .reading()
                    .with_context(|| format!("Invalid {} window in usage response", kind.api_field()))?;
                readings.insert(kind, reading);
            }
        }
        Ok(readings)
    }
}

/// Whole-percent rounding, halves away from zero
pub fn round_percent(utilization: f64) -> f64 {
    if utilization.is_finite() {
        utilization.round()
    } else {
        0.0
    }
}

/// Parse an RFC 3339 reset time at millisecond precision, the resolution the
/// state record stores, so a reloaded epoch compares equal to a fresh one.
pub fn parse_reset_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc).trunc_subsecs(3))
        .with_context(|| format!("Invalid reset timestamp: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RESPONSE: &str = r#"{
        "five_hour": {"utilization": 74.5, "resets_at": "2025-06-01T15:00:00.123+00:00"},
        "seven_day": {"utilization": 41.2, "resets_at": "2025-06-05T08:00:00Z"},
        "seven_day_opus": {"utilization": 12.0, "resets_at": null},
        "seven_day_sonnet": null,
        "extra_usage": {"is_enabled": true, "monthly_limit": 50.0, "used_credits": 12.5, "utilization": 25.0}
    }"#;

    #[test]
    fn test_parse_api_response() {
        let snapshot: UsageSnapshot = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(snapshot.percent(WindowKind::FiveHour), 75.0);
        assert_eq!(snapshot.percent(WindowKind::Weekly), 41.0);
        assert!(snapshot.seven_day_opus.is_some());
        assert!(snapshot.seven_day_sonnet.is_none());
        assert!(snapshot.extra_usage.as_ref().unwrap().is_enabled);
    }

    #[test]
    fn test_readings_from_snapshot() {
        let snapshot: UsageSnapshot = serde_json::from_str(RESPONSE).unwrap();
        let readings = snapshot.readings().unwrap();

        let five_hour = readings[&WindowKind::FiveHour];
        assert_eq!(five_hour.percent_used, 75.0);
        assert_eq!(
            five_hour.reset_at.map(|t| t.timestamp()),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap().timestamp())
        );
        assert_eq!(
            readings[&WindowKind::Weekly].reset_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 5, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_window_is_omitted() {
        let snapshot: UsageSnapshot =
            serde_json::from_str(r#"{"seven_day": {"utilization": 10, "resets_at": null}}"#).unwrap();
        let readings = snapshot.readings().unwrap();
        assert!(!readings.contains_key(&WindowKind::FiveHour));
        assert_eq!(readings[&WindowKind::Weekly].reset_at, None);
        assert_eq!(snapshot.percent(WindowKind::FiveHour), 0.0);
    }

    #[test]
    fn test_invalid_reset_timestamp_is_error() {
        let snapshot: UsageSnapshot =
            serde_json::from_str(r#"{"five_hour": {"utilization": 10, "resets_at": "tomorrow"}}"#).unwrap();
        assert!(snapshot.readings().is_err());
    }

    #[test]
    fn test_reset_timestamp_truncated_to_millis() {
        let parsed = parse_reset_timestamp("2025-06-02T15:00:00.943648+00:00").unwrap();
        assert_eq!(parsed.timestamp_subsec_nanos(), 943_000_000);
        assert_eq!(DateTime::from_timestamp_millis(parsed.timestamp_millis()), Some(parsed));
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(74.5), 75.0);
        assert_eq!(round_percent(74.49), 74.0);
        assert_eq!(round_percent(104.6), 105.0);
        assert_eq!(round_percent(f64::NAN), 0.0);
    }
}
