//! # Pattern Detector Library
//!
//! Stateless classifiers, one per gesture archetype. Each takes the samples
//! of a finished stroke (or a touch pair for pinch) plus its parameters and
//! returns a fresh [`DetectionResult`].
//!
//! | Detector  | Min points | Accepts when                                      |
//! |-----------|-----------:|---------------------------------------------------|
//! | circle    | 8          | mean radius in bounds, low radial variation       |
//! | swipe     | 3          | far enough, fast enough, optional direction       |
//! | line      | 3          | long enough, low deviation from the chord         |
//! | zigzag    | 6          | enough direction reversals with enough amplitude  |
//! | doubleTap | 2 strokes  | previous and current stroke both still, close by   |
//! | pinch     | 2 strokes  | finger distance ratio moved past the threshold    |
//! | spiral    | 12         | accumulated winding reaches the turn count        |
//!
//! Below the minimum length a detector returns a miss without further work.

mod circle;
mod line;
mod pinch;
mod spiral;
mod swipe;
mod tap;
mod zigzag;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::capture::TouchPair;
use crate::error::GestureResult;
use crate::event::Sample;
use crate::geometry::Point;

pub use circle::CircleParams;
pub use line::LineParams;
pub use pinch::PinchParams;
pub use spiral::SpiralParams;
pub use swipe::{classify_direction, SwipeDirection, SwipeParams};
pub use tap::{DoubleTapParams, TAP_RADIUS};
pub use zigzag::ZigzagParams;

/// Gesture archetype, as reported in dispatched events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectorKind {
    /// Closed round stroke.
    Circle,
    /// Fast directional flick.
    Swipe,
    /// Straight stroke.
    Line,
    /// Back-and-forth stroke.
    Zigzag,
    /// Two taps in quick succession.
    DoubleTap,
    /// Two-finger scale.
    Pinch,
    /// Stroke winding around its center several times.
    Spiral,
    /// Caller-supplied detector.
    Custom,
    /// Chain of detectors over successive strokes.
    Sequence,
    /// Misconfigured detector that never matches.
    Unknown,
}

impl DetectorKind {
    /// Stable name used in events and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Swipe => "swipe",
            Self::Line => "line",
            Self::Zigzag => "zigzag",
            Self::DoubleTap => "doubleTap",
            Self::Pinch => "pinch",
            Self::Spiral => "spiral",
            Self::Custom => "custom",
            Self::Sequence => "sequence",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archetype-specific measurements of a detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum Metrics {
    /// Nothing measured (misses and synthetic detections).
    #[default]
    None,
    /// Circle: centroid, mean radius and coefficient of variation of the radius.
    Circle {
        center: Point,
        radius: f64,
        variation: f64,
    },
    /// Swipe: direction, displacement, speed in px/ms, angle in degrees, duration.
    Swipe {
        direction: SwipeDirection,
        distance: f64,
        velocity: f64,
        angle: f64,
        duration_ms: u64,
    },
    /// Line: signed angle in degrees, chord length, mean deviation, straightness.
    Line {
        angle: f64,
        length: f64,
        deviation: f64,
        straightness: f64,
    },
    /// Zigzag: number of reversals and their mean lateral amplitude.
    Zigzag { reversals: usize, amplitude: f64 },
    /// Double tap: midpoint of the taps, their distance and the time between them.
    DoubleTap {
        center: Point,
        distance: f64,
        gap_ms: u64,
    },
    /// Pinch: scale ratio, zoom direction and the current midpoint.
    Pinch {
        scale: f64,
        is_zoom_in: bool,
        is_zoom_out: bool,
        center: Point,
    },
    /// Spiral: fractional turn count and winding direction on screen.
    Spiral { turns: f64, clockwise: bool },
    /// Sequence: number of steps completed.
    Sequence { steps: usize },
    /// Custom detector payload.
    Custom { data: serde_json::Value },
}

/// Outcome of running a detector against a stroke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the archetype was recognized.
    pub detected: bool,
    /// Confidence in `[0, 1]`, when the detector computes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Archetype-specific measurements.
    #[serde(default)]
    pub metrics: Metrics,
}

impl DetectionResult {
    /// A non-detection.
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }

    /// A detection with the given confidence and measurements.
    #[must_use]
    pub fn hit(confidence: f64, metrics: Metrics) -> Self {
        Self {
            detected: true,
            confidence: Some(confidence.clamp(0.0, 1.0)),
            metrics,
        }
    }
}

/// What a detector gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    /// Samples of the primary stroke.
    pub points: &'a [Sample],
    /// Both strokes, when two fingers were down.
    pub pair: Option<TouchPair<'a>>,
    /// The single-touch stroke that ended just before this one, if it is
    /// recent enough to be the first half of a double tap.
    pub previous_stroke: Option<&'a [Sample]>,
}

impl<'a> DetectorInput<'a> {
    /// Input for a single stroke.
    #[must_use]
    pub fn new(points: &'a [Sample]) -> Self {
        Self {
            points,
            pair: None,
            previous_stroke: None,
        }
    }

    /// Attach a touch pair.
    #[must_use]
    pub fn with_pair(mut self, pair: Option<TouchPair<'a>>) -> Self {
        self.pair = pair;
        self
    }

    /// Attach the preceding stroke for double-tap detection.
    #[must_use]
    pub fn with_previous_stroke(mut self, previous: Option<&'a [Sample]>) -> Self {
        self.previous_stroke = previous;
        self
    }
}

/// Signature of a caller-supplied detector.
pub type CustomFn = dyn Fn(&DetectorInput<'_>) -> GestureResult<DetectionResult>;

/// A caller-supplied detector, isolated so that errors and panics inside it
/// count as a miss.
#[derive(Clone)]
pub struct CustomDetector {
    func: Rc<CustomFn>,
}

impl CustomDetector {
    /// Wrap a detector function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&DetectorInput<'_>) -> GestureResult<DetectionResult> + 'static,
    {
        Self {
            func: Rc::new(func),
        }
    }

    fn run(&self, input: &DetectorInput<'_>) -> DetectionResult {
        match catch_unwind(AssertUnwindSafe(|| (self.func)(input))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Custom detector failed: {e}");
                DetectionResult::miss()
            }
            Err(_) => {
                tracing::warn!("Custom detector panicked");
                DetectionResult::miss()
            }
        }
    }
}

impl fmt::Debug for CustomDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDetector").finish_non_exhaustive()
    }
}

/// A configured detector.
#[derive(Debug, Clone)]
pub enum Detector {
    /// Circle detector.
    Circle(CircleParams),
    /// Swipe detector.
    Swipe(SwipeParams),
    /// Line detector.
    Line(LineParams),
    /// Zigzag detector.
    Zigzag(ZigzagParams),
    /// Double-tap detector.
    DoubleTap(DoubleTapParams),
    /// Pinch detector (needs two strokes).
    Pinch(PinchParams),
    /// Spiral detector.
    Spiral(SpiralParams),
    /// Caller-supplied detector.
    Custom(CustomDetector),
    /// Unrecognized detector name; never detects.
    Unknown(String),
}

impl Detector {
    /// Build a detector with default parameters from its configuration name.
    ///
    /// Accepts the archetype names plus `swipeUp`, `swipeDown`, `swipeLeft`
    /// and `swipeRight`. Anything else yields [`Detector::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "circle" => Self::Circle(CircleParams::default()),
            "swipe" => Self::Swipe(SwipeParams::default()),
            "swipeUp" => Self::Swipe(SwipeParams::towards(SwipeDirection::Up)),
            "swipeDown" => Self::Swipe(SwipeParams::towards(SwipeDirection::Down)),
            "swipeLeft" => Self::Swipe(SwipeParams::towards(SwipeDirection::Left)),
            "swipeRight" => Self::Swipe(SwipeParams::towards(SwipeDirection::Right)),
            "line" => Self::Line(LineParams::default()),
            "zigzag" => Self::Zigzag(ZigzagParams::default()),
            "doubleTap" => Self::DoubleTap(DoubleTapParams::default()),
            "pinch" => Self::Pinch(PinchParams::default()),
            "spiral" => Self::Spiral(SpiralParams::default()),
            other => {
                tracing::warn!("Unknown detector type '{other}'; rule will never match");
                Self::Unknown(other.to_string())
            }
        }
    }

    /// Build a detector from its configuration name and JSON parameters.
    ///
    /// A `null` parameter object means defaults. Parameters that do not
    /// deserialize leave the rule inert, like an unknown name.
    #[must_use]
    pub fn from_config(name: &str, params: &serde_json::Value) -> Self {
        fn parse<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, serde_json::Error> {
            serde_json::from_value(params.clone())
        }

        let base = Self::from_name(name);
        if params.is_null() {
            return base;
        }
        let parsed = match base {
            Self::Circle(_) => parse(params).map(Self::Circle),
            Self::Swipe(defaults) => parse::<SwipeParams>(params).map(|mut p| {
                p.direction = p.direction.or(defaults.direction);
                Self::Swipe(p)
            }),
            Self::Line(_) => parse(params).map(Self::Line),
            Self::Zigzag(_) => parse(params).map(Self::Zigzag),
            Self::DoubleTap(_) => parse(params).map(Self::DoubleTap),
            Self::Pinch(_) => parse(params).map(Self::Pinch),
            Self::Spiral(_) => parse(params).map(Self::Spiral),
            other => return other,
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!("Invalid parameters for detector '{name}': {e}; rule will never match");
            Self::Unknown(name.to_string())
        })
    }

    /// Archetype of this detector.
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::Circle(_) => DetectorKind::Circle,
            Self::Swipe(_) => DetectorKind::Swipe,
            Self::Line(_) => DetectorKind::Line,
            Self::Zigzag(_) => DetectorKind::Zigzag,
            Self::DoubleTap(_) => DetectorKind::DoubleTap,
            Self::Pinch(_) => DetectorKind::Pinch,
            Self::Spiral(_) => DetectorKind::Spiral,
            Self::Custom(_) => DetectorKind::Custom,
            Self::Unknown(_) => DetectorKind::Unknown,
        }
    }

    /// Run the detector.
    #[must_use]
    pub fn detect(&self, input: &DetectorInput<'_>) -> DetectionResult {
        match self {
            Self::Circle(params) => circle::detect(input.points, params),
            Self::Swipe(params) => swipe::detect(input.points, params),
            Self::Line(params) => line::detect(input.points, params),
            Self::Zigzag(params) => zigzag::detect(input.points, params),
            Self::DoubleTap(params) => tap::detect(input.previous_stroke, input.points, params),
            Self::Pinch(params) => input
                .pair
                .map_or_else(DetectionResult::miss, |pair| pinch::detect(pair, params)),
            Self::Spiral(params) => spiral::detect(input.points, params),
            Self::Custom(custom) => custom.run(input),
            Self::Unknown(_) => DetectionResult::miss(),
        }
    }
}
