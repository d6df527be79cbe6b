use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::StateStore;
use crate::alerts::state::{AlertState, WindowState};

/// On-disk shape of [`AlertState`]. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStateRecord {
    #[serde(default, deserialize_with = "lenient_thresholds")]
    pub five_hour_alerted: Vec<u32>,
    #[serde(default, deserialize_with = "lenient_thresholds")]
    pub weekly_alerted: Vec<u32>,
    #[serde(default)]
    pub five_hour_reset_at: Option<i64>,
    #[serde(default)]
    pub weekly_reset_at: Option<i64>,
    #[serde(default)]
    pub last_check: i64,
    #[serde(default)]
    pub last_auth_error: Option<i64>,
    #[serde(default)]
    pub auth_error_alerted: bool,
}

/// Accept any JSON number (`75`, `75.0`) as a threshold; values that are not
/// a whole, non-negative percent are dropped rather than failing the record.
fn lenient_thresholds<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32)
        .collect())
}

impl From<&AlertState> for AlertStateRecord {
    fn from(state: &AlertState) -> Self {
        Self {
            five_hour_alerted: state.five_hour.alerted_thresholds.iter().copied().collect(),
            weekly_alerted: state.weekly.alerted_thresholds.iter().copied().collect(),
            five_hour_reset_at: state.five_hour.reset_at.map(|t| t.timestamp_millis()),
            weekly_reset_at: state.weekly.reset_at.map(|t| t.timestamp_millis()),
            last_check: state.last_check.map(|t| t.timestamp_millis()).unwrap_or(0),
            last_auth_error: state.last_auth_error.map(|t| t.timestamp_millis()),
            auth_error_alerted: state.auth_error_alerted,
        }
    }
}

impl From<AlertStateRecord> for AlertState {
    fn from(record: AlertStateRecord) -> Self {
        Self {
            five_hour: WindowState {
                alerted_thresholds: record.five_hour_alerted.into_iter().collect(),
                reset_at: record.five_hour_reset_at.and_then(DateTime::from_timestamp_millis),
            },
            weekly: WindowState {
                alerted_thresholds: record.weekly_alerted.into_iter().collect(),
                reset_at: record.weekly_reset_at.and_then(DateTime::from_timestamp_millis),
            },
            last_check: Some(record.last_check)
                .filter(|millis| *millis > 0)
                .and_then(DateTime::from_timestamp_millis),
            last_auth_error: record.last_auth_error.and_then(DateTime::from_timestamp_millis),
            auth_error_alerted: record.auth_error_alerted,
        }
    }
}

/// Stores the alert state as a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Result<Option<AlertStateRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read alert state: {}", self.path.display())
                });
            }
        };

        let record = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse alert state: {}", self.path.display()))?;
        Ok(Some(record))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> AlertState {
        match self.read_record() {
            Ok(Some(record)) => record.into(),
            Ok(None) => {
                debug!(path = %self.path.display(), "No alert state yet, starting fresh");
                AlertState::default()
            }
            Err(e) => {
                warn!("{e:#}; starting from an empty alert state");
                AlertState::default()
            }
        }
    }

    fn save(&self, state: &AlertState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&AlertStateRecord::from(state))
            .context("Failed to serialize alert state")?;

        // Temp file + rename keeps the record whole if the process dies mid-write
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write alert state: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace alert state: {}", self.path.display()))?;

        Ok(())
    }
}
