use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::alerts::state::AlertState;
use crate::alerts::thresholds::{AlertEvent, Thresholds, WindowKind};

/// One window's utilization as observed in a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageReading {
    pub percent_used: f64,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Readings keyed by window; a missing window means "no update this cycle".
pub type Readings = BTreeMap<WindowKind, UsageReading>;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub next_state: AlertState,
    pub due_alerts: Vec<AlertEvent>,
}

/// Compute the next dedup state and the alerts that are newly due.
///
/// For each window present in `readings`:
/// 1. a change of `reset_at` between two non-null values is an epoch
///    rollover and clears the window's alerted thresholds;
/// 2. every threshold at or below `percent_used` that has not been alerted in
///    the current epoch produces one [`AlertEvent`] and is marked alerted;
/// 3. the window adopts the reading's `reset_at`.
///
/// Alerts come out in canonical window order, thresholds ascending. The
/// function is pure; persisting `next_state` and delivering the alerts is up
/// to the caller.
pub fn evaluate(state: &AlertState, readings: &Readings, thresholds: &Thresholds) -> Evaluation {
    let mut next_state = state.clone();
    let mut due_alerts = Vec::new();

    for (&kind, reading) in readings {
        let window = next_state.window_mut(kind);

        if let (Some(current), Some(previous)) = (reading.reset_at, window.reset_at) {
            if current != previous {
                window.alerted_thresholds.clear();
            }
        }

        for threshold in thresholds.for_window(kind).iter() {
            if reading.percent_used >= f64::from(threshold)
                && window.alerted_thresholds.insert(threshold)
            {
                due_alerts.push(AlertEvent {
                    kind,
                    threshold,
                    percent_used: reading.percent_used,
                    reset_at: reading.reset_at,
                });
            }
        }

        window.reset_at = reading.reset_at;
    }

    Evaluation {
        next_state,
        due_alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::thresholds::ThresholdSet;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn t2() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap()
    }

    fn five_hour(percent_used: f64, reset_at: Option<DateTime<Utc>>) -> Readings {
        let mut readings = Readings::new();
        readings.insert(WindowKind::FiveHour, UsageReading { percent_used, reset_at });
        readings
    }

    fn thresholds(five_hour: &[u32]) -> Thresholds {
        Thresholds {
            five_hour: ThresholdSet::new(five_hour.iter().copied()),
            ..Thresholds::default()
        }
    }

    fn fired(evaluation: &Evaluation) -> Vec<u32> {
        evaluation.due_alerts.iter().map(|a| a.threshold).collect()
    }

    #[test]
    fn test_identical_readings_are_idempotent() {
        let thresholds = Thresholds::default();
        let readings = five_hour(92.0, Some(t1()));

        let first = evaluate(&AlertState::default(), &readings, &thresholds);
        assert_eq!(fired(&first), vec![75, 90]);

        let second = evaluate(&first.next_state, &readings, &thresholds);
        assert!(second.due_alerts.is_empty());
        assert_eq!(second.next_state, first.next_state);
    }

    #[test]
    fn test_alerted_set_grows_monotonically_within_epoch() {
        let thresholds = Thresholds::default();
        let mut state = AlertState::default();
        let mut previous_len = 0;

        for percent in [10.0, 76.0, 76.0, 91.0, 95.0, 99.0, 100.0, 130.0] {
            state = evaluate(&state, &five_hour(percent, Some(t1())), &thresholds).next_state;
            let len = state.five_hour.alerted_thresholds.len();
            assert!(len >= previous_len, "alerted set shrank at {percent}%");
            previous_len = len;
        }
        assert_eq!(previous_len, 4);
    }

    #[test]
    fn test_rollover_clears_state() {
        let mut state = AlertState::default();
        state.five_hour.reset_at = Some(t1());
        state.five_hour.alerted_thresholds = BTreeSet::from([75, 90]);

        let evaluation = evaluate(&state, &five_hour(80.0, Some(t2())), &thresholds(&[75, 90]));

        assert_eq!(fired(&evaluation), vec![75]);
        assert_eq!(evaluation.next_state.five_hour.alerted_thresholds, BTreeSet::from([75]));
        assert_eq!(evaluation.next_state.five_hour.reset_at, Some(t2()));
        assert_eq!(evaluation.due_alerts[0].reset_at, Some(t2()));
    }

    #[test]
    fn test_first_observation_is_not_a_rollover() {
        let evaluation = evaluate(
            &AlertState::default(),
            &five_hour(80.0, Some(t1())),
            &thresholds(&[75, 90]),
        );

        assert_eq!(fired(&evaluation), vec![75]);
        assert_eq!(evaluation.next_state.five_hour.reset_at, Some(t1()));
    }

    #[test]
    fn test_null_to_non_null_keeps_alerted_set() {
        let mut state = AlertState::default();
        state.five_hour.alerted_thresholds = BTreeSet::from([75]);

        let evaluation = evaluate(&state, &five_hour(80.0, Some(t1())), &thresholds(&[75, 90]));

        assert!(evaluation.due_alerts.is_empty());
        assert_eq!(evaluation.next_state.five_hour.alerted_thresholds, BTreeSet::from([75]));
    }

    #[test]
    fn test_non_null_to_null_is_not_a_rollover() {
        let mut state = AlertState::default();
        state.five_hour.reset_at = Some(t1());
        state.five_hour.alerted_thresholds = BTreeSet::from([75]);

        let evaluation = evaluate(&state, &five_hour(80.0, None), &thresholds(&[75, 90]));

        assert!(evaluation.due_alerts.is_empty());
        assert_eq!(evaluation.next_state.five_hour.alerted_thresholds, BTreeSet::from([75]));
        assert_eq!(evaluation.next_state.five_hour.reset_at, None);
    }

    #[test]
    fn test_single_jump_fires_every_crossed_threshold() {
        let mut state = AlertState::default();
        state.five_hour.reset_at = Some(t1());
        let state = evaluate(&state, &five_hour(60.0, Some(t1())), &Thresholds::default()).next_state;

        let evaluation = evaluate(&state, &five_hour(97.0, Some(t1())), &Thresholds::default());
        assert_eq!(fired(&evaluation), vec![75, 90, 95]);
    }

    #[test]
    fn test_regression_does_not_unfire() {
        let first = evaluate(&AlertState::default(), &five_hour(91.0, Some(t1())), &Thresholds::default());
        assert_eq!(fired(&first), vec![75, 90]);

        let second = evaluate(&first.next_state, &five_hour(80.0, Some(t1())), &Thresholds::default());
        assert!(second.due_alerts.is_empty());
        assert_eq!(
            second.next_state.five_hour.alerted_thresholds,
            first.next_state.five_hour.alerted_thresholds
        );
    }

    #[test]
    fn test_overage_matches_hundred_threshold() {
        let evaluation = evaluate(
            &AlertState::default(),
            &five_hour(105.0, Some(t1())),
            &thresholds(&[100, 110]),
        );
        assert_eq!(fired(&evaluation), vec![100]);
        assert_eq!(evaluation.due_alerts[0].percent_used, 105.0);
    }

    #[test]
    fn test_omitted_window_is_untouched() {
        let mut state = AlertState::default();
        state.weekly.reset_at = Some(t1());
        state.weekly.alerted_thresholds = BTreeSet::from([50, 75]);

        let evaluation = evaluate(&state, &five_hour(10.0, Some(t2())), &Thresholds::default());

        assert_eq!(evaluation.next_state.weekly, state.weekly);
    }

    #[test]
    fn test_alert_order_is_window_then_threshold() {
        let mut readings = Readings::new();
        readings.insert(WindowKind::Weekly, UsageReading { percent_used: 80.0, reset_at: Some(t2()) });
        readings.insert(WindowKind::FiveHour, UsageReading { percent_used: 91.0, reset_at: Some(t1()) });

        let evaluation = evaluate(&AlertState::default(), &readings, &Thresholds::default());
        let order: Vec<(WindowKind, u32)> = evaluation
            .due_alerts
            .iter()
            .map(|a| (a.kind, a.threshold))
            .collect();

        assert_eq!(
            order,
            vec![
                (WindowKind::FiveHour, 75),
                (WindowKind::FiveHour, 90),
                (WindowKind::Weekly, 50),
                (WindowKind::Weekly, 75),
            ]
        );
    }

    #[test]
    fn test_below_all_thresholds_records_epoch_only() {
        let evaluation = evaluate(&AlertState::default(), &five_hour(12.0, Some(t1())), &Thresholds::default());
        assert!(evaluation.due_alerts.is_empty());
        assert!(evaluation.next_state.five_hour.alerted_thresholds.is_empty());
        assert_eq!(evaluation.next_state.five_hour.reset_at, Some(t1()));
    }
}
