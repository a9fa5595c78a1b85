//! Double-tap detection.
//!
//! A double tap is two consecutive single-touch strokes: the stroke before
//! the current one (kept by the engine for a short while) and the current
//! stroke. Each must stay within [`TAP_RADIUS`] of where it started. A stroke
//! is never split internally, so one press, however long it is held or
//! however sparsely the host reports it, is at most one tap.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{centroid, Point};

/// Maximum movement within one tap, in pixels.
pub const TAP_RADIUS: f64 = 10.0;

/// Double-tap detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleTapParams {
    /// Maximum distance between the two taps, in pixels.
    pub max_distance: f64,
    /// Maximum time between the end of the first tap and the start of the
    /// second, in milliseconds.
    pub max_time_ms: u64,
}

impl Default for DoubleTapParams {
    fn default() -> Self {
        Self {
            max_distance: 30.0,
            max_time_ms: 300,
        }
    }
}

fn is_still(stroke: &[Sample]) -> bool {
    stroke
        .first()
        .is_some_and(|anchor| stroke.iter().all(|s| anchor.distance_to(s) < TAP_RADIUS))
}

pub(super) fn detect(
    previous: Option<&[Sample]>,
    current: &[Sample],
    params: &DoubleTapParams,
) -> DetectionResult {
    let Some(first) = previous else {
        return DetectionResult::miss();
    };
    let second = current;
    if !is_still(first) || !is_still(second) {
        return DetectionResult::miss();
    }

    let (Some(c1), Some(c2)) = (centroid(first), centroid(second)) else {
        return DetectionResult::miss();
    };
    let distance = c1.distance_to(c2);
    let (Some(first_end), Some(second_start)) = (first.last(), second.first()) else {
        return DetectionResult::miss();
    };
    let gap_ms = second_start
        .timestamp_ms
        .saturating_sub(first_end.timestamp_ms);
    if distance > params.max_distance || gap_ms > params.max_time_ms {
        return DetectionResult::miss();
    }

    let confidence = if params.max_distance > 0.0 {
        1.0 - distance / params.max_distance * 0.5
    } else {
        1.0
    };
    DetectionResult::hit(
        confidence,
        Metrics::DoubleTap {
            center: Point::new((c1.x + c2.x) / 2.0, (c1.y + c2.y) / 2.0),
            distance,
            gap_ms,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(x: f64, y: f64, t: u64) -> Vec<Sample> {
        vec![Sample::new(x, y, t), Sample::new(x + 1.0, y, t + 40)]
    }

    #[test]
    fn test_two_taps_detected() {
        let first = tap(100.0, 100.0, 0);
        let second = tap(104.0, 102.0, 200);
        let result = detect(Some(first.as_slice()), &second, &DoubleTapParams::default());
        assert!(result.detected);
        match result.metrics {
            Metrics::DoubleTap { gap_ms, distance, .. } => {
                assert_eq!(gap_ms, 160);
                assert!(distance < 10.0);
            }
            other => panic!("Expected double tap metrics, got {other:?}"),
        }
    }

    #[test]
    fn test_taps_too_far_apart() {
        let first = tap(0.0, 0.0, 0);
        let second = tap(100.0, 0.0, 200);
        assert!(!detect(Some(first.as_slice()), &second, &DoubleTapParams::default()).detected);
    }

    #[test]
    fn test_taps_too_slow() {
        let first = tap(0.0, 0.0, 0);
        let second = tap(2.0, 0.0, 1000);
        assert!(!detect(Some(first.as_slice()), &second, &DoubleTapParams::default()).detected);
    }

    #[test]
    fn test_single_tap_not_double() {
        assert!(!detect(None, &tap(0.0, 0.0, 0), &DoubleTapParams::default()).detected);
    }

    #[test]
    fn test_held_press_with_sparse_samples_not_double() {
        // Down and up 100ms apart with nothing reported in between.
        let press = vec![Sample::new(50.0, 50.0, 0), Sample::new(50.0, 50.0, 100)];
        assert!(!detect(None, &press, &DoubleTapParams::default()).detected);

        let stuttering = vec![
            Sample::new(50.0, 50.0, 0),
            Sample::new(50.0, 50.0, 90),
            Sample::new(51.0, 50.0, 200),
            Sample::new(51.0, 50.0, 320),
        ];
        assert!(!detect(None, &stuttering, &DoubleTapParams::default()).detected);
    }

    #[test]
    fn test_dragging_first_stroke_rejected() {
        let drag = vec![Sample::new(0.0, 0.0, 0), Sample::new(30.0, 0.0, 20)];
        let second = tap(5.0, 0.0, 200);
        assert!(!detect(Some(drag.as_slice()), &second, &DoubleTapParams::default()).detected);
    }

    #[test]
    fn test_dragging_second_stroke_rejected() {
        let first = tap(0.0, 0.0, 0);
        let drag = vec![Sample::new(0.0, 0.0, 150), Sample::new(25.0, 0.0, 170)];
        assert!(!detect(Some(first.as_slice()), &drag, &DoubleTapParams::default()).detected);
    }
}
