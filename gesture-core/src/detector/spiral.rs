//! Spiral detection by accumulated winding around the centroid.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::{DetectionResult, Metrics};
use crate::event::Sample;
use crate::geometry::{centroid, wrap_angle, Point};

/// Minimum samples for a spiral.
pub const MIN_POINTS: usize = 12;

/// Spiral detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralParams {
    /// Minimum number of full turns (fractional).
    pub min_turns: f64,
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self { min_turns: 1.5 }
    }
}

pub(super) fn detect(points: &[Sample], params: &SpiralParams) -> DetectionResult {
    if points.len() < MIN_POINTS {
        return DetectionResult::miss();
    }
    let Some(center) = centroid(points) else {
        return DetectionResult::miss();
    };

    let angles: Vec<f64> = points
        .iter()
        .map(Point::from)
        .filter(|p| p.distance_to(center) > f64::EPSILON)
        .map(|p| (p.y - center.y).atan2(p.x - center.x))
        .collect();
    let total: f64 = angles.windows(2).map(|w| wrap_angle(w[1] - w[0])).sum();

    let turns = total.abs() / TAU;
    if turns < params.min_turns {
        return DetectionResult::miss();
    }

    let confidence = if params.min_turns > 0.0 {
        (turns / params.min_turns).min(1.0)
    } else {
        1.0
    };
    DetectionResult::hit(
        confidence,
        Metrics::Spiral {
            turns,
            // Y grows downwards, so a positive winding is clockwise on screen.
            clockwise: total > 0.0,
        },
    )
}
