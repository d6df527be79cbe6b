pub mod auth_gate;
pub mod cycle;
pub mod notifications;
pub mod state;
pub mod thresholds;
pub mod tracker;

pub use cycle::{AlertCycle, CheckReport, CycleError, ErrorReport};
pub use notifications::{NotificationDispatcher, Notifier};
pub use state::{AlertState, WindowState};
pub use thresholds::{AlertEvent, ThresholdSet, Thresholds, WindowKind};
pub use tracker::{Evaluation, Readings, UsageReading, evaluate};
