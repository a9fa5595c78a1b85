//! Two-finger pinch detection.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::capture::TouchPair;
use crate::geometry::Point;

/// Pinch detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinchParams {
    /// Minimum `|scale - 1|`.
    pub threshold: f64,
}

impl Default for PinchParams {
    fn default() -> Self {
        Self { threshold: 0.2 }
    }
}

pub(super) fn detect(pair: TouchPair<'_>, params: &PinchParams) -> DetectionResult {
    let (Some(a0), Some(a1), Some(b0), Some(b1)) = (
        pair.first.start(),
        pair.first.current(),
        pair.second.start(),
        pair.second.current(),
    ) else {
        return DetectionResult::miss();
    };

    let initial = a0.distance_to(b0);
    if initial <= f64::EPSILON {
        return DetectionResult::miss();
    }
    let scale = a1.distance_to(b1) / initial;
    let change = (scale - 1.0).abs();
    if change < params.threshold {
        return DetectionResult::miss();
    }

    let confidence = if params.threshold > 0.0 {
        change / (params.threshold * 2.0)
    } else {
        1.0
    };
    DetectionResult::hit(
        confidence,
        Metrics::Pinch {
            scale,
            is_zoom_in: scale > 1.0,
            is_zoom_out: scale < 1.0,
            center: Point::new((a1.x + b1.x) / 2.0, (a1.y + b1.y) / 2.0),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Stroke;
    use crate::event::Sample;

    fn finger(from: f64, to: f64) -> Stroke {
        Stroke::new(vec![Sample::new(from, 0.0, 0), Sample::new(to, 0.0, 100)])
    }

    #[test]
    fn test_spread_is_zoom_in() {
        let (first, second) = (finger(100.0, 50.0), finger(200.0, 250.0));
        let result = detect(
            TouchPair {
                first: &first,
                second: &second,
            },
            &PinchParams::default(),
        );
        assert!(result.detected);
        match result.metrics {
            Metrics::Pinch {
                scale,
                is_zoom_in,
                is_zoom_out,
                center,
            } => {
                assert!((scale - 2.0).abs() < 1e-9);
                assert!(is_zoom_in);
                assert!(!is_zoom_out);
                assert!((center.x - 150.0).abs() < 1e-9);
            }
            other => panic!("Expected pinch metrics, got {other:?}"),
        }
    }

    #[test]
    fn test_squeeze_is_zoom_out() {
        let (first, second) = (finger(0.0, 40.0), finger(200.0, 160.0));
        let result = detect(
            TouchPair {
                first: &first,
                second: &second,
            },
            &PinchParams::default(),
        );
        assert!(matches!(
            result.metrics,
            Metrics::Pinch {
                is_zoom_out: true,
                ..
            }
        ));
    }

    #[test]
    fn test_small_change_ignored() {
        let (first, second) = (finger(100.0, 95.0), finger(200.0, 205.0));
        let pair = TouchPair {
            first: &first,
            second: &second,
        };
        assert!(!detect(pair, &PinchParams::default()).detected);
    }

    #[test]
    fn test_coincident_start_ignored() {
        let (first, second) = (finger(100.0, 0.0), finger(100.0, 200.0));
        let pair = TouchPair {
            first: &first,
            second: &second,
        };
        assert!(!detect(pair, &PinchParams::default()).detected);
    }
}
