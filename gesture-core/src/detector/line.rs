//! Straight line detection against the first-to-last chord.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{angle_deg, perpendicular_distance, Point};

/// Minimum samples for a line.
pub const MIN_POINTS: usize = 3;

/// Line detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineParams {
    /// Minimum chord length in pixels.
    pub min_length: f64,
    /// Maximum mean perpendicular deviation in pixels.
    pub max_deviation: f64,
    /// Minimum `1 - deviation / length`.
    pub straightness: f64,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            min_length: 50.0,
            max_deviation: 10.0,
            straightness: 0.9,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn detect(points: &[Sample], params: &LineParams) -> DetectionResult {
    if points.len() < MIN_POINTS {
        return DetectionResult::miss();
    }
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return DetectionResult::miss();
    };
    let (a, b) = (Point::from(first), Point::from(last));

    let length = a.distance_to(b);
    if length <= 0.0 || length < params.min_length {
        return DetectionResult::miss();
    }

    let deviation = points
        .iter()
        .map(|s| perpendicular_distance(Point::from(s), a, b))
        .sum::<f64>()
        / points.len() as f64;
    let straightness = 1.0 - deviation / length;
    if deviation > params.max_deviation || straightness < params.straightness {
        return DetectionResult::miss();
    }

    DetectionResult::hit(
        straightness,
        Metrics::Line {
            angle: angle_deg(a, b),
            length,
            deviation,
            straightness,
        },
    )
}
