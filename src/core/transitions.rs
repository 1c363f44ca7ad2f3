//! State changes of a pixel neighbourhood ("event density").
//!
//! Within the area, an event whose polarity differs from the previous one
//! in that area is a transition; a repeat of the same polarity is a
//! redundancy. The timing between transitions shows how quickly a pixel
//! follows the stimulus.

use crate::core::activity::PixelArea;
use crate::error::{AnalysisError, Result};
use crate::source::Event;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelTransitions {
    /// Time of each state change, in ms since the first change
    pub change_times_ms: Vec<f64>,
    /// Time between consecutive changes, in ms
    pub intervals_ms: Vec<f64>,
    /// Events that repeated the current state
    pub redundancies: u64,
}

/// Aggregate view of a transition series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSummary {
    pub changes: usize,
    pub redundancies: u64,
    pub mean_interval_ms: Option<f64>,
    pub std_dev_interval_ms: Option<f64>,
    pub min_interval_ms: Option<f64>,
    pub max_interval_ms: Option<f64>,
}

impl PixelTransitions {
    pub fn summary(&self) -> TransitionSummary {
        let intervals = &self.intervals_ms;
        let (mean, std_dev, min, max) = if intervals.is_empty() {
            (None, None, None, None)
        } else {
            let std_dev = if intervals.len() > 1 {
                Some(intervals.iter().std_dev())
            } else {
                None
            };
            (
                Some(intervals.iter().mean()),
                std_dev,
                Some(Statistics::min(intervals.iter())),
                Some(Statistics::max(intervals.iter())),
            )
        };

        TransitionSummary {
            changes: self.change_times_ms.len(),
            redundancies: self.redundancies,
            mean_interval_ms: mean,
            std_dev_interval_ms: std_dev,
            min_interval_ms: min,
            max_interval_ms: max,
        }
    }
}

/// Track the ON/OFF state changes inside `area`.
///
/// Stops reading once `max_changes` transitions have been recorded.
pub fn detect_transitions<I>(
    events: I,
    area: PixelArea,
    max_changes: Option<usize>,
) -> Result<PixelTransitions>
where
    I: IntoIterator<Item = Result<Event>>,
{
    if max_changes == Some(0) {
        return Err(AnalysisError::Argument(
            "max plot points must be greater than 0".to_string(),
        ));
    }

    let mut change_timestamps: Vec<i64> = Vec::new();
    let mut redundancies = 0u64;
    let mut last_state = None;

    for event in events {
        let event = event?;
        if !area.contains(event.x, event.y) {
            continue;
        }

        if last_state == Some(event.on) {
            redundancies += 1;
            continue;
        }

        last_state = Some(event.on);
        change_timestamps.push(event.timestamp);
        if max_changes.is_some_and(|max| change_timestamps.len() >= max) {
            debug!(changes = change_timestamps.len(), "change limit reached");
            break;
        }
    }

    let first = change_timestamps.first().copied().unwrap_or_default();
    let change_times_ms: Vec<f64> = change_timestamps
        .iter()
        .map(|&t| t.saturating_sub(first) as f64 / 1000.0)
        .collect();
    let intervals_ms = change_times_ms.windows(2).map(|w| w[1] - w[0]).collect();

    Ok(PixelTransitions {
        change_times_ms,
        intervals_ms,
        redundancies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(raw: &[(bool, i32, i32, i64)]) -> Vec<Result<Event>> {
        raw.iter()
            .map(|&(on, x, y, t)| Ok(Event::new(on, x, y, t)))
            .collect()
    }

    #[test]
    fn test_changes_and_redundancies() {
        let input = events(&[
            (true, 5, 5, 1000),
            (true, 5, 5, 1500),
            (false, 5, 6, 3000),
            (false, 40, 40, 3100),
            (true, 6, 5, 7000),
        ]);
        let transitions = detect_transitions(input, PixelArea::new(5, 5, 2), None).unwrap();

        assert_eq!(transitions.change_times_ms, vec![0.0, 2.0, 6.0]);
        assert_eq!(transitions.intervals_ms, vec![2.0, 4.0]);
        assert_eq!(transitions.redundancies, 1);

        let summary = transitions.summary();
        assert_eq!(summary.changes, 3);
        assert_eq!(summary.mean_interval_ms, Some(3.0));
        assert_eq!(summary.min_interval_ms, Some(2.0));
        assert_eq!(summary.max_interval_ms, Some(4.0));
        let std_dev = summary.std_dev_interval_ms.unwrap();
        assert!((std_dev - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_max_changes() {
        let input = events(&[
            (true, 0, 0, 0),
            (false, 0, 0, 1000),
            (true, 0, 0, 2000),
            (false, 0, 0, 3000),
        ]);
        let transitions = detect_transitions(input, PixelArea::new(0, 0, 1), Some(2)).unwrap();

        assert_eq!(transitions.change_times_ms, vec![0.0, 1.0]);
    }

    #[test]
    fn test_no_events_in_area() {
        let input = events(&[(true, 50, 50, 0)]);
        let transitions = detect_transitions(input, PixelArea::new(0, 0, 3), None).unwrap();

        assert!(transitions.change_times_ms.is_empty());
        let summary = transitions.summary();
        assert_eq!(summary.changes, 0);
        assert!(summary.mean_interval_ms.is_none());
        assert!(summary.std_dev_interval_ms.is_none());
    }

    #[test]
    fn test_zero_max_changes_is_argument_error() {
        assert!(matches!(
            detect_transitions(events(&[]), PixelArea::new(0, 0, 1), Some(0)),
            Err(AnalysisError::Argument(_))
        ));
    }
}
