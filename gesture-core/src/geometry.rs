//! Planar geometry helpers shared by the detectors and rule gating.

use serde::{Deserialize, Serialize};

use crate::event::Sample;

/// A 2D point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<&Sample> for Point {
    fn from(sample: &Sample) -> Self {
        Self::new(sample.x, sample.y)
    }
}

/// Axis-aligned rectangle used to restrict rules to a region of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point lies within the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Check that every sample lies within the rectangle.
    #[must_use]
    pub fn contains_all(&self, samples: &[Sample]) -> bool {
        samples.iter().all(|s| self.contains(s.x, s.y))
    }
}

/// Mean position of a set of samples. Returns `None` when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(samples: &[Sample]) -> Option<Point> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let (sx, sy) = samples
        .iter()
        .fold((0.0, 0.0), |(ax, ay), s| (ax + s.x, ay + s.y));
    Some(Point::new(sx / n, sy / n))
}

/// Angle of the vector `from -> to` in degrees, in `(-180, 180]`.
///
/// Screen coordinates: positive Y points down, so 90° is "down".
#[must_use]
pub fn angle_deg(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

/// Perpendicular distance of `p` from the infinite line through `a` and `b`.
///
/// Falls back to the distance from `a` when `a` and `b` coincide.
#[must_use]
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let length = a.distance_to(b);
    if length <= f64::EPSILON {
        return p.distance_to(a);
    }
    let cross = (b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y);
    cross.abs() / length
}

/// Wrap an angle in radians into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(mut radians: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    while radians > PI {
        radians -= TAU;
    }
    while radians <= -PI {
        radians += TAU;
    }
    radians
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(110.0, 60.0));
        assert!(!rect.contains(9.9, 30.0));
        assert!(!rect.contains(50.0, 60.1));
    }

    #[test]
    fn test_rect_contains_all() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inside = [Sample::new(1.0, 1.0, 0), Sample::new(99.0, 99.0, 1)];
        let straddling = [Sample::new(1.0, 1.0, 0), Sample::new(101.0, 50.0, 1)];
        assert!(rect.contains_all(&inside));
        assert!(!rect.contains_all(&straddling));
    }

    #[test]
    fn test_centroid() {
        assert!(centroid(&[]).is_none());
        let points = [
            Sample::new(0.0, 0.0, 0),
            Sample::new(10.0, 0.0, 0),
            Sample::new(10.0, 10.0, 0),
            Sample::new(0.0, 10.0, 0),
        ];
        let c = centroid(&points).unwrap();
        assert!((c.x - 5.0).abs() < 1e-9);
        assert!((c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_screen_orientation() {
        let origin = Point::new(0.0, 0.0);
        assert!((angle_deg(origin, Point::new(1.0, 0.0))).abs() < 1e-9);
        assert!((angle_deg(origin, Point::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((angle_deg(origin, Point::new(0.0, -1.0)) + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_perpendicular_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((perpendicular_distance(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((perpendicular_distance(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_angle() {
        use std::f64::consts::PI;
        assert!((wrap_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-9);
        assert!((wrap_angle(-1.5 * PI) - 0.5 * PI).abs() < 1e-9);
        assert!((wrap_angle(PI) - PI).abs() < 1e-9);
    }
}
