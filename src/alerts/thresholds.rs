use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::utils::date_format::{format_reset_clock, format_reset_relative};

pub const DEFAULT_FIVE_HOUR_THRESHOLDS: [u32; 4] = [75, 90, 95, 100];
pub const DEFAULT_WEEKLY_THRESHOLDS: [u32; 5] = [50, 75, 90, 95, 100];

pub const AUTH_FAILED_MESSAGE: &str = "⚠️ <b>Claude Usage Monitor Auth Failed</b>\n\nToken missing/expired. Run <code>claude /login</code>.";

/// A metered quota window with its own utilization and reset timestamp.
///
/// The derived ordering is the canonical evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    FiveHour,
    Weekly,
}

impl WindowKind {
    pub const ALL: [WindowKind; 2] = [WindowKind::FiveHour, WindowKind::Weekly];

    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::FiveHour => "5-Hour",
            WindowKind::Weekly => "Weekly",
        }
    }

    /// Field name of this window in the usage API response
    pub fn api_field(&self) -> &'static str {
        match self {
            WindowKind::FiveHour => "five_hour",
            WindowKind::Weekly => "seven_day",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ascending, deduplicated percentage breakpoints for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct ThresholdSet(BTreeSet<u32>);

impl ThresholdSet {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self(values.into_iter().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Parse a comma-separated list such as `"75,90,95,100"`
    pub fn parse_list(value: &str) -> anyhow::Result<Self> {
        let mut values = Vec::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let threshold: u32 = part
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid threshold value: {}", part))?;
            values.push(threshold);
        }
        if values.is_empty() {
            anyhow::bail!("Threshold list must contain at least one value");
        }
        Ok(Self::new(values))
    }
}

impl From<Vec<u32>> for ThresholdSet {
    fn from(values: Vec<u32>) -> Self {
        Self::new(values)
    }
}

impl From<ThresholdSet> for Vec<u32> {
    fn from(set: ThresholdSet) -> Self {
        set.to_vec()
    }
}

impl fmt::Display for ThresholdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|t| t.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Threshold sets for every alerted window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub five_hour: ThresholdSet,
    pub weekly: ThresholdSet,
}

impl Thresholds {
    pub fn for_window(&self, kind: WindowKind) -> &ThresholdSet {
        match kind {
            WindowKind::FiveHour => &self.five_hour,
            WindowKind::Weekly => &self.weekly,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            five_hour: ThresholdSet::new(DEFAULT_FIVE_HOUR_THRESHOLDS),
            weekly: ThresholdSet::new(DEFAULT_WEEKLY_THRESHOLDS),
        }
    }
}

/// A due notification for one (window, threshold, epoch).
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: WindowKind,
    pub threshold: u32,
    pub percent_used: f64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl AlertEvent {
    pub fn emoji(&self) -> &'static str {
        match self.threshold {
            t if t >= 100 => "🔴",
            t if t >= 95 => "🟠",
            t if t >= 75 => "🟡",
            _ => "⚠️",
        }
    }

    /// HTML message body, suitable for `parse_mode=HTML` chat delivery
    pub fn message(&self, now: DateTime<Utc>, timezone: Tz) -> String {
        let resets = match self.reset_at {
            Some(reset_at) => format!(
                "{} ({})",
                format_reset_clock(reset_at, timezone),
                format_reset_relative(reset_at, now)
            ),
            None => "?".to_string(),
        };
        format!(
            "{} <b>{} Usage: {:.0}%</b>\nResets: {}",
            self.emoji(),
            self.kind.label(),
            self.percent_used,
            resets
        )
    }
}
