//! Swipe detection from the first-to-last displacement.

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{angle_deg, Point};

/// Minimum samples for a swipe.
pub const MIN_POINTS: usize = 3;

/// Direction of a swipe on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    /// Towards the top of the surface.
    Up,
    /// Towards the bottom of the surface.
    Down,
    /// Towards the left edge.
    Left,
    /// Towards the right edge.
    Right,
}

impl SwipeDirection {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Classify an angle in degrees (screen coordinates, Y down).
///
/// Sectors: right `[-45, 45]`, down `(45, 135]`, up `[-135, -45)`, left
/// everything else. Total over all finite angles.
#[must_use]
pub fn classify_direction(angle: f64) -> SwipeDirection {
    if (-45.0..=45.0).contains(&angle) {
        SwipeDirection::Right
    } else if angle > 45.0 && angle <= 135.0 {
        SwipeDirection::Down
    } else if (-135.0..-45.0).contains(&angle) {
        SwipeDirection::Up
    } else {
        SwipeDirection::Left
    }
}

/// Swipe detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeParams {
    /// Minimum displacement in pixels.
    pub min_distance: f64,
    /// Maximum duration in milliseconds.
    pub max_time_ms: u64,
    /// Only accept swipes in this direction.
    pub direction: Option<SwipeDirection>,
}

impl SwipeParams {
    /// Default parameters restricted to one direction.
    #[must_use]
    pub fn towards(direction: SwipeDirection) -> Self {
        Self {
            direction: Some(direction),
            ..Self::default()
        }
    }
}

impl Default for SwipeParams {
    fn default() -> Self {
        Self {
            min_distance: 50.0,
            max_time_ms: 500,
            direction: None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn detect(points: &[Sample], params: &SwipeParams) -> DetectionResult {
    if points.len() < MIN_POINTS {
        return DetectionResult::miss();
    }
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return DetectionResult::miss();
    };

    let distance = first.distance_to(last);
    let duration_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);
    if distance < params.min_distance || duration_ms > params.max_time_ms {
        return DetectionResult::miss();
    }

    let angle = angle_deg(Point::from(first), Point::from(last));
    let direction = classify_direction(angle);
    if params.direction.is_some_and(|wanted| wanted != direction) {
        return DetectionResult::miss();
    }

    let velocity = distance / duration_ms.max(1) as f64;
    let confidence = (distance / (params.min_distance * 2.0)).min(1.0);

    DetectionResult::hit(
        confidence,
        Metrics::Swipe {
            direction,
            distance,
            velocity,
            angle,
            duration_ms,
        },
    )
}
