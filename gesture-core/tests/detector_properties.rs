//! Property tests for the detector library.

use gesture_core::detector::classify_direction;
use gesture_core::{Detector, DetectorInput, Metrics, Sample, SwipeDirection};
use proptest::prelude::*;

fn ring(radius: f64, count: u32, cx: f64, cy: f64) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let a = f64::from(i) / f64::from(count) * std::f64::consts::TAU;
            Sample::new(cx + radius * a.cos(), cy + radius * a.sin(), u64::from(i) * 16)
        })
        .collect()
}

fn expected_direction(angle: f64) -> SwipeDirection {
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

proptest! {
    #[test]
    fn prop_circle_radius_recovered(
        radius in 21.0f64..149.0,
        count in 8u32..96,
        cx in -500.0f64..500.0,
        cy in -500.0f64..500.0,
    ) {
        let points = ring(radius, count, cx, cy);
        let result = Detector::from_name("circle").detect(&DetectorInput::new(&points));
        prop_assert!(result.detected, "radius {} with {} points not detected", radius, count);
        match result.metrics {
            Metrics::Circle { radius: measured, .. } => {
                prop_assert!((measured - radius).abs() < 1e-6 * radius.max(1.0));
            }
            other => prop_assert!(false, "unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn prop_swipe_direction_is_total_and_stable(angle in -180.0f64..180.0) {
        let first = classify_direction(angle);
        prop_assert_eq!(first, classify_direction(angle));
        prop_assert_eq!(first, expected_direction(angle));
    }

    #[test]
    fn prop_horizontal_line_has_zero_angle(
        length in 60.0f64..800.0,
        count in 3u32..40,
        jitter in prop::collection::vec(-3.0f64..3.0, 40),
    ) {
        let points: Vec<Sample> = (0..count)
            .map(|i| {
                let t = f64::from(i) / f64::from(count - 1);
                let dy = if i == 0 || i == count - 1 { 0.0 } else { jitter[i as usize] };
                Sample::new(t * length, 100.0 + dy, u64::from(i) * 10)
            })
            .collect();
        let result = Detector::from_name("line").detect(&DetectorInput::new(&points));
        prop_assert!(result.detected);
        match result.metrics {
            Metrics::Line { angle, .. } => prop_assert!(angle.abs() < 1e-9),
            other => prop_assert!(false, "unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn prop_single_stroke_is_never_double_tap(
        steps in prop::collection::vec((0.0f64..20.0, 1u64..400), 1..80),
    ) {
        let mut points = vec![Sample::new(0.0, 0.0, 0)];
        for (dx, dt) in steps {
            let Some(last) = points.last().copied() else { break };
            points.push(Sample::new(last.x + dx, last.y, last.timestamp_ms + dt));
        }
        let result = Detector::from_name("doubleTap").detect(&DetectorInput::new(&points));
        prop_assert!(!result.detected);
    }

    #[test]
    fn prop_nearby_still_strokes_are_double_tap(
        dx in -5.0f64..5.0,
        dy in -5.0f64..5.0,
        hold in 0u64..400,
        gap in 0u64..=300,
    ) {
        let first = vec![Sample::new(100.0, 100.0, 0), Sample::new(100.0, 100.0, hold)];
        let start = hold + gap;
        let second = vec![
            Sample::new(100.0 + dx, 100.0 + dy, start),
            Sample::new(100.0 + dx, 100.0 + dy, start + hold),
        ];
        let input = DetectorInput::new(&second).with_previous_stroke(Some(first.as_slice()));
        prop_assert!(Detector::from_name("doubleTap").detect(&input).detected);
    }
}

#[test]
fn test_boundary_angles_are_fixed() {
    assert_eq!(classify_direction(45.0), SwipeDirection::Right);
    assert_eq!(classify_direction(-45.0), SwipeDirection::Right);
    assert_eq!(classify_direction(135.0), SwipeDirection::Down);
    assert_eq!(classify_direction(-135.0), SwipeDirection::Up);
    assert_eq!(classify_direction(-180.0), SwipeDirection::Left);
}
