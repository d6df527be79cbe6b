use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::alerts::thresholds::WindowKind;

/// Dedup state of one window for its current reset epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    /// Thresholds already notified in this epoch
    pub alerted_thresholds: BTreeSet<u32>,
    /// Reset timestamp identifying the epoch the set belongs to
    pub reset_at: Option<DateTime<Utc>>,
}

/// Process-wide alert dedup state, loaded before and saved after every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    pub five_hour: WindowState,
    pub weekly: WindowState,
    pub last_check: Option<DateTime<Utc>>,
    pub last_auth_error: Option<DateTime<Utc>>,
    pub auth_error_alerted: bool,
}

impl AlertState {
    pub fn window(&self, kind: WindowKind) -> &WindowState {
        match kind {
            WindowKind::FiveHour => &self.five_hour,
            WindowKind::Weekly => &self.weekly,
        }
    }

    pub fn window_mut(&mut self, kind: WindowKind) -> &mut WindowState {
        match kind {
            WindowKind::FiveHour => &mut self.five_hour,
            WindowKind::Weekly => &mut self.weekly,
        }
    }
}
