use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::alerts::state::AlertState;
use crate::alerts::thresholds::WindowKind;
use crate::storage::AlertStateRecord;
use crate::usage::summary::{ModelWindowSummary, UsageSummary, WindowSummary};

pub const BAR_WIDTH: usize = 20;

/// Trait for items that can be displayed as tables or JSON
pub trait OutputFormat {
    fn to_table(&self) -> String;
    fn to_json(&self) -> Result<String, serde_json::Error>;
}

/// Row of the usage summary table
#[derive(Tabled, Serialize, Debug)]
pub struct UsageRow {
    #[tabled(rename = "Window")]
    pub window: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "")]
    pub bar: String,
    #[tabled(rename = "Resets In")]
    pub resets_in: String,
}

/// Row of the alert state table
#[derive(Tabled, Serialize, Debug)]
pub struct AlertStateRow {
    #[tabled(rename = "Window")]
    pub window: String,
    #[tabled(rename = "Alerted Thresholds")]
    pub alerted: String,
    #[tabled(rename = "Epoch Resets At")]
    pub reset_at: String,
}

impl UsageRow {
    fn from_window(name: &str, window: &WindowSummary) -> Self {
        Self::new(name, window.percent, window.reset_in.as_deref())
    }

    fn from_model(name: &str, window: &ModelWindowSummary) -> Self {
        Self::new(name, window.percent, window.reset_in.as_deref())
    }

    fn new(name: &str, percent: i64, reset_in: Option<&str>) -> Self {
        Self {
            window: name.to_string(),
            used: format!("{}%", percent),
            bar: render_bar(percent, BAR_WIDTH),
            resets_in: reset_in.unwrap_or("-").to_string(),
        }
    }
}

/// Fixed-width text bar, clamped to 0..=100
pub fn render_bar(percent: i64, width: usize) -> String {
    let clamped = percent.clamp(0, 100) as usize;
    let filled = (clamped * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn format_credits(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "?".to_string())
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl OutputFormat for UsageSummary {
    fn to_table(&self) -> String {
        let mut rows = vec![
            UsageRow::from_window(WindowKind::FiveHour.label(), &self.five_hour),
            UsageRow::from_window(WindowKind::Weekly.label(), &self.weekly),
        ];
        if let Some(opus) = &self.opus {
            rows.push(UsageRow::from_model("Weekly (Opus)", opus));
        }
        if let Some(sonnet) = &self.sonnet {
            rows.push(UsageRow::from_model("Weekly (Sonnet)", sonnet));
        }

        let mut output = Table::new(rows).with(Style::rounded()).to_string();
        if let Some(extra) = &self.extra_usage {
            output.push_str(&format!(
                "\nExtra usage: {} / {} credits ({}%)",
                format_credits(extra.used),
                format_credits(extra.limit),
                extra.percent
            ));
        }
        output
    }

    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl OutputFormat for AlertState {
    fn to_table(&self) -> String {
        let rows: Vec<AlertStateRow> = WindowKind::ALL
            .iter()
            .map(|&kind| {
                let window = self.window(kind);
                let alerted: Vec<String> = window
                    .alerted_thresholds
                    .iter()
                    .map(|t| format!("{}%", t))
                    .collect();
                AlertStateRow {
                    window: kind.label().to_string(),
                    alerted: if alerted.is_empty() { "-".to_string() } else { alerted.join(", ") },
                    reset_at: format_timestamp(window.reset_at),
                }
            })
            .collect();

        let auth = if self.auth_error_alerted {
            format!("failing since {}", format_timestamp(self.last_auth_error))
        } else {
            "healthy".to_string()
        };

        format!(
            "{}\nLast check: {}\nAuth: {}",
            Table::new(rows).with(Style::rounded()),
            format_timestamp(self.last_check),
            auth
        )
    }

    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&AlertStateRecord::from(self))
    }
}
