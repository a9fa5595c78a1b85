//! Circle detection by radial variation around the centroid.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{centroid, Point};

/// Minimum samples for a circle.
pub const MIN_POINTS: usize = 8;

/// Circle detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    /// Smallest accepted mean radius in pixels.
    pub min_radius: f64,
    /// Largest accepted mean radius in pixels.
    pub max_radius: f64,
    /// Upper bound (exclusive) on `stdDev / mean` of the radius.
    pub tolerance: f64,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            min_radius: 20.0,
            max_radius: 150.0,
            tolerance: 0.3,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn detect(points: &[Sample], params: &CircleParams) -> DetectionResult {
    if points.len() < MIN_POINTS {
        return DetectionResult::miss();
    }
    let Some(center) = centroid(points) else {
        return DetectionResult::miss();
    };

    let n = points.len() as f64;
    let distances: Vec<f64> = points
        .iter()
        .map(|s| Point::from(s).distance_to(center))
        .collect();
    let radius = distances.iter().sum::<f64>() / n;

    // A degenerate stroke has zero radius; the variation below would be NaN.
    if radius <= 0.0 || radius < params.min_radius || radius > params.max_radius {
        return DetectionResult::miss();
    }

    let variance = distances.iter().map(|d| (d - radius).powi(2)).sum::<f64>() / n;
    let variation = variance.sqrt() / radius;
    if variation >= params.tolerance {
        return DetectionResult::miss();
    }

    DetectionResult::hit(
        1.0 - variation,
        Metrics::Circle {
            center,
            radius,
            variation,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(cx: f64, cy: f64, radius: f64, count: u32) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                let a = f64::from(i) / f64::from(count) * std::f64::consts::TAU;
                Sample::new(cx + radius * a.cos(), cy + radius * a.sin(), u64::from(i) * 50)
            })
            .collect()
    }

    #[test]
    fn test_detects_even_circle() {
        let result = detect(&ring(100.0, 100.0, 80.0, 16), &CircleParams::default());
        assert!(result.detected);
        match result.metrics {
            Metrics::Circle { center, radius, .. } => {
                assert!((radius - 80.0).abs() < 0.5);
                assert!((center.x - 100.0).abs() < 1e-6);
                assert!((center.y - 100.0).abs() < 1e-6);
            }
            other => panic!("Expected circle metrics, got {other:?}"),
        }
    }

    #[test]
    fn test_too_few_points() {
        let result = detect(&ring(0.0, 0.0, 80.0, 7), &CircleParams::default());
        assert!(!result.detected);
    }

    #[test]
    fn test_radius_bounds() {
        let params = CircleParams {
            min_radius: 150.0,
            max_radius: 400.0,
            ..CircleParams::default()
        };
        assert!(!detect(&ring(0.0, 0.0, 60.0, 16), &params).detected);
        assert!(detect(&ring(0.0, 0.0, 200.0, 16), &params).detected);
        assert!(!detect(&ring(0.0, 0.0, 200.0, 16), &CircleParams::default()).detected);
    }

    #[test]
    fn test_degenerate_points() {
        let points = vec![Sample::new(5.0, 5.0, 0); 12];
        let params = CircleParams {
            min_radius: 0.0,
            ..CircleParams::default()
        };
        assert!(!detect(&points, &params).detected);
    }

    #[test]
    fn test_straight_stroke_rejected() {
        let points: Vec<Sample> = (0..16u32)
            .map(|i| Sample::new(f64::from(i) * 10.0, 0.0, u64::from(i)))
            .collect();
        assert!(!detect(&points, &CircleParams::default()).detected);
    }
}
