use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{UsageSnapshot, UsageWindowApi, round_percent};
use crate::utils::date_format::format_time_until;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub percent: i64,
    pub reset_in: Option<String>,
    /// Epoch milliseconds
    pub reset_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelWindowSummary {
    pub percent: i64,
    pub reset_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraUsageSummary {
    pub used: Option<f64>,
    pub limit: Option<f64>,
    pub percent: i64,
}

/// Dashboard view of a usage snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub five_hour: WindowSummary,
    pub weekly: WindowSummary,
    pub opus: Option<ModelWindowSummary>,
    pub sonnet: Option<ModelWindowSummary>,
    pub extra_usage: Option<ExtraUsageSummary>,
    pub timestamp: i64,
    pub source: &'static str,
}

impl UsageSummary {
    pub fn from_snapshot(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            five_hour: window_summary(snapshot.five_hour.as_ref(), now)?,
            weekly: window_summary(snapshot.seven_day.as_ref(), now)?,
            opus: model_summary(snapshot.seven_day_opus.as_ref(), now)?,
            sonnet: model_summary(snapshot.seven_day_sonnet.as_ref(), now)?,
            extra_usage: snapshot
                .extra_usage
                .as_ref()
                .filter(|extra| extra.is_enabled)
                .map(|extra| ExtraUsageSummary {
                    used: extra.used_credits,
                    limit: extra.monthly_limit,
                    percent: round_percent(extra.utilization.unwrap_or(0.0)) as i64,
                }),
            timestamp: now.timestamp_millis(),
            source: "live",
        })
    }
}

fn window_summary(window: Option<&UsageWindowApi>, now: DateTime<Utc>) -> Result<WindowSummary> {
    let Some(window) = window else {
        return Ok(WindowSummary {
            percent: 0,
            reset_in: None,
            reset_at: None,
        });
    };
    let reset_at = window.reset_at()?;
    Ok(WindowSummary {
        percent: window.percent() as i64,
        reset_in: reset_at.map(|t| format_time_until(t, now)),
        reset_at: reset_at.map(|t| t.timestamp_millis()),
    })
}

fn model_summary(
    window: Option<&UsageWindowApi>,
    now: DateTime<Utc>,
) -> Result<Option<ModelWindowSummary>> {
    let Some(window) = window else {
        return Ok(None);
    };
    Ok(Some(ModelWindowSummary {
        percent: window.percent() as i64,
        reset_in: window.reset_at()?.map(|t| format_time_until(t, now)),
    }))
}
