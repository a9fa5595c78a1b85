//! Zigzag detection by counting direction reversals.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{wrap_angle, Point};

/// Minimum samples for a zigzag.
pub const MIN_POINTS: usize = 6;

/// Heading change, in degrees, that counts as a reversal.
const REVERSAL_ANGLE: f64 = 45.0;

/// Zigzag detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigzagParams {
    /// Minimum number of direction reversals.
    pub min_reversals: usize,
    /// Minimum mean distance of the reversal points from the first-to-last
    /// chord, in pixels.
    pub amplitude: f64,
}

impl Default for ZigzagParams {
    fn default() -> Self {
        Self {
            min_reversals: 3,
            amplitude: 20.0,
        }
    }
}

/// Signed distance of `p` from the chord `a -> b`.
fn lateral_offset(p: Point, a: Point, b: Point) -> f64 {
    let length = a.distance_to(b);
    if length <= f64::EPSILON {
        return p.distance_to(a);
    }
    ((b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)) / length
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn detect(points: &[Sample], params: &ZigzagParams) -> DetectionResult {
    if points.len() < MIN_POINTS {
        return DetectionResult::miss();
    }

    // Repeated positions carry no heading.
    let mut path: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().map(Point::from) {
        if path.last().map_or(true, |last| last.distance_to(p) > f64::EPSILON) {
            path.push(p);
        }
    }
    if path.len() < 3 {
        return DetectionResult::miss();
    }

    let (start, end) = (path[0], path[path.len() - 1]);
    let mut reversals = 0usize;
    let mut amplitude_sum = 0.0;

    for window in path.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        let heading_in = (b.y - a.y).atan2(b.x - a.x);
        let heading_out = (c.y - b.y).atan2(c.x - b.x);
        let turn = wrap_angle(heading_out - heading_in).abs().to_degrees();
        if turn > REVERSAL_ANGLE {
            amplitude_sum += lateral_offset(b, start, end).abs();
            reversals += 1;
        }
    }

    if reversals == 0 {
        return DetectionResult::miss();
    }
    let amplitude = amplitude_sum / reversals as f64;
    if reversals < params.min_reversals || amplitude < params.amplitude {
        return DetectionResult::miss();
    }

    let wanted = params.min_reversals.max(1) as f64;
    DetectionResult::hit(
        reversals as f64 / wanted,
        Metrics::Zigzag {
            reversals,
            amplitude,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Alternates `height` either side of the chord, ending back on it.
    fn zigzag(peaks: u32, height: f64) -> Vec<Sample> {
        (0..=peaks)
            .map(|i| {
                let y = if i == 0 || i == peaks {
                    0.0
                } else if i % 2 == 1 {
                    height
                } else {
                    -height
                };
                Sample::new(f64::from(i) * 20.0, y, u64::from(i) * 30)
            })
            .collect()
    }

    #[test]
    fn test_detects_zigzag() {
        let result = detect(&zigzag(6, 30.0), &ZigzagParams::default());
        assert!(result.detected);
        match result.metrics {
            Metrics::Zigzag {
                reversals,
                amplitude,
            } => {
                assert_eq!(reversals, 5);
                assert!((amplitude - 30.0).abs() < 1e-9);
            }
            other => panic!("Expected zigzag metrics, got {other:?}"),
        }
    }

    #[test]
    fn test_low_amplitude_rejected() {
        assert!(!detect(&zigzag(6, 5.0), &ZigzagParams::default()).detected);
    }

    #[test]
    fn test_amplitude_measured_from_chord() {
        let params = ZigzagParams {
            min_reversals: 3,
            amplitude: 20.0,
        };
        // Swings are 24px peak to peak but no point is more than 12px off the chord.
        assert!(!detect(&zigzag(8, 12.0), &params).detected);

        match detect(&zigzag(8, 25.0), &params).metrics {
            Metrics::Zigzag { amplitude, .. } => assert!((amplitude - 25.0).abs() < 1e-9),
            other => panic!("Expected zigzag metrics, got {other:?}"),
        }
    }

    #[test]
    fn test_straight_stroke_rejected() {
        assert!(!detect(&zigzag(8, 0.0), &ZigzagParams::default()).detected);
    }

    #[test]
    fn test_too_few_reversals() {
        let params = ZigzagParams {
            min_reversals: 6,
            ..ZigzagParams::default()
        };
        assert!(!detect(&zigzag(6, 30.0), &params).detected);
    }

    #[test]
    fn test_duplicate_samples_ignored() {
        let mut points = zigzag(6, 30.0);
        let dup = points[2];
        points.insert(2, dup);
        points.insert(2, dup);
        match detect(&points, &ZigzagParams::default()).metrics {
            Metrics::Zigzag { reversals, .. } => assert_eq!(reversals, 5),
            other => panic!("Expected zigzag metrics, got {other:?}"),
        }
    }
}
