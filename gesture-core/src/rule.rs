//! # Gesture Rules
//!
//! A rule binds a name to a detector (or a sequence of detectors) plus the
//! gating the arbitration pass applies before dispatching it: an optional
//! predicate, a cooldown, a priority, a screen area and a touch count.
//!
//! Rules are registered through a fluent builder that records the rule as
//! soon as the detector is chosen:
//!
//! ```rust,ignore
//! engine
//!     .gesture("delete")
//!     .circle()
//!     .priority(10)
//!     .cooldown(500)
//!     .on(|event| println!("{}", event.name));
//! ```
//!
//! Registering a name that already exists replaces the older rule.

use serde::{Deserialize, Serialize};

use crate::capture::CapturedGesture;
use crate::detector::{
    CircleParams, CustomDetector, DetectionResult, Detector, DetectorInput, DetectorKind,
    DoubleTapParams, LineParams, PinchParams, SpiralParams, SwipeDirection, SwipeParams,
    ZigzagParams,
};
use crate::engine::GestureEvent;
use crate::error::GestureResult;
use crate::geometry::Rect;
use crate::sequence::{SequenceRule, DEFAULT_STEP_TIMEOUT_MS};

/// Callback invoked when a rule fires.
pub type GestureCallback = Box<dyn FnMut(&GestureEvent)>;

/// Extra acceptance test run after a successful detection.
pub type Condition = Box<dyn Fn(&DetectionResult, &CapturedGesture) -> bool>;

/// What a rule matches against.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// A single detector run against each stroke.
    Single(Detector),
    /// An ordered chain of detectors over successive strokes.
    Sequence(SequenceRule),
}

impl Matcher {
    /// Archetype reported in dispatched events.
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::Single(detector) => detector.kind(),
            Self::Sequence(_) => DetectorKind::Sequence,
        }
    }
}

/// A registered gesture rule.
pub struct GestureRule {
    pub(crate) name: String,
    pub(crate) matcher: Matcher,
    pub(crate) condition: Option<Condition>,
    pub(crate) callback: Option<GestureCallback>,
    pub(crate) cooldown_ms: u64,
    pub(crate) priority: i32,
    pub(crate) area: Option<Rect>,
    pub(crate) required_touches: usize,
    pub(crate) enabled: bool,
    pub(crate) last_triggered_ms: Option<u64>,
}

impl GestureRule {
    /// Create an enabled rule with no gating.
    ///
    /// Pinch rules require two touches.
    #[must_use]
    pub fn new(name: impl Into<String>, matcher: Matcher) -> Self {
        let required_touches = if matcher.kind() == DetectorKind::Pinch {
            2
        } else {
            1
        };
        Self {
            name: name.into(),
            matcher,
            condition: None,
            callback: None,
            cooldown_ms: 0,
            priority: 0,
            area: None,
            required_touches,
            enabled: true,
            last_triggered_ms: None,
        }
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archetype of the rule's matcher.
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        self.matcher.kind()
    }

    /// The rule's matcher.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Priority; higher wins.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Minimum time between two firings.
    #[must_use]
    pub const fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Screen area every sample must fall within.
    #[must_use]
    pub const fn area(&self) -> Option<Rect> {
        self.area
    }

    /// Minimum number of concurrent touches.
    #[must_use]
    pub const fn required_touches(&self) -> usize {
        self.required_touches
    }

    /// Check if the rule takes part in arbitration.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When the rule last fired.
    #[must_use]
    pub const fn last_triggered_ms(&self) -> Option<u64> {
        self.last_triggered_ms
    }

    /// Check if the rule fired less than its cooldown ago.
    #[must_use]
    pub fn is_cooling_down(&self, now_ms: u64) -> bool {
        self.last_triggered_ms
            .is_some_and(|t| now_ms.saturating_sub(t) < self.cooldown_ms)
    }

    /// Check the area and touch-count gates against a captured gesture.
    #[must_use]
    pub fn admits(&self, gesture: &CapturedGesture) -> bool {
        if gesture.touch_count < self.required_touches {
            return false;
        }
        self.area
            .map_or(true, |area| gesture.strokes().all(|s| area.contains_all(s.samples())))
    }

    pub(crate) fn detect(&self, input: &DetectorInput<'_>) -> DetectionResult {
        match &self.matcher {
            Matcher::Single(detector) => detector.detect(input),
            // Sequence completion is tracked by the engine.
            Matcher::Sequence(_) => DetectionResult::miss(),
        }
    }

    pub(crate) fn passes_condition(&self, result: &DetectionResult, gesture: &CapturedGesture) -> bool {
        self.condition.as_ref().map_or(true, |cond| cond(result, gesture))
    }
}

impl std::fmt::Debug for GestureRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRule")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("priority", &self.priority)
            .field("area", &self.area)
            .field("required_touches", &self.required_touches)
            .field("enabled", &self.enabled)
            .field("last_triggered_ms", &self.last_triggered_ms)
            .finish_non_exhaustive()
    }
}

/// Rules in registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<GestureRule>,
}

impl RuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, replacing any rule with the same name.
    pub fn insert(&mut self, rule: GestureRule) -> &mut GestureRule {
        if self.remove(&rule.name) {
            tracing::info!("Replacing gesture rule '{}'", rule.name);
        } else {
            tracing::debug!("Registered gesture rule '{}' ({})", rule.name, rule.kind());
        }
        let index = self.rules.len();
        self.rules.push(rule);
        &mut self.rules[index]
    }

    /// Remove a rule by name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    /// Look up a rule.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GestureRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Look up a rule mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut GestureRule> {
        self.rules.iter_mut().find(|r| r.name == name)
    }

    /// Enable or disable a rule. Returns `false` for unknown names.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.get_mut(name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Remove every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Rule names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &GestureRule> {
        self.rules.iter()
    }

    /// Indices of enabled rules, highest priority first, ties in
    /// registration order.
    #[must_use]
    pub fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rules.len())
            .filter(|&i| self.rules[i].enabled)
            .collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.rules[i].priority));
        order
    }

    pub(crate) fn rules_mut(&mut self) -> &mut [GestureRule] {
        &mut self.rules
    }

    pub(crate) fn rules(&self) -> &[GestureRule] {
        &self.rules
    }
}

/// First half of the rule builder: pick the detector.
#[derive(Debug)]
pub struct GestureSelector<'a> {
    registry: &'a mut RuleRegistry,
    name: String,
}

impl<'a> GestureSelector<'a> {
    pub(crate) fn new(registry: &'a mut RuleRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
        }
    }

    /// Register the rule with any detector.
    pub fn detector(self, detector: Detector) -> RuleHandle<'a> {
        self.register(Matcher::Single(detector))
    }

    /// Circle with default parameters.
    pub fn circle(self) -> RuleHandle<'a> {
        self.circle_with(CircleParams::default())
    }

    /// Circle with custom parameters.
    pub fn circle_with(self, params: CircleParams) -> RuleHandle<'a> {
        self.detector(Detector::Circle(params))
    }

    /// Swipe in any direction.
    pub fn swipe(self) -> RuleHandle<'a> {
        self.swipe_with(SwipeParams::default())
    }

    /// Swipe with custom parameters.
    pub fn swipe_with(self, params: SwipeParams) -> RuleHandle<'a> {
        self.detector(Detector::Swipe(params))
    }

    /// Upward swipe.
    pub fn swipe_up(self) -> RuleHandle<'a> {
        self.swipe_with(SwipeParams::towards(SwipeDirection::Up))
    }

    /// Downward swipe.
    pub fn swipe_down(self) -> RuleHandle<'a> {
        self.swipe_with(SwipeParams::towards(SwipeDirection::Down))
    }

    /// Leftward swipe.
    pub fn swipe_left(self) -> RuleHandle<'a> {
        self.swipe_with(SwipeParams::towards(SwipeDirection::Left))
    }

    /// Rightward swipe.
    pub fn swipe_right(self) -> RuleHandle<'a> {
        self.swipe_with(SwipeParams::towards(SwipeDirection::Right))
    }

    /// Straight line with default parameters.
    pub fn line(self) -> RuleHandle<'a> {
        self.line_with(LineParams::default())
    }

    /// Straight line with custom parameters.
    pub fn line_with(self, params: LineParams) -> RuleHandle<'a> {
        self.detector(Detector::Line(params))
    }

    /// Zigzag with default parameters.
    pub fn zigzag(self) -> RuleHandle<'a> {
        self.zigzag_with(ZigzagParams::default())
    }

    /// Zigzag with custom parameters.
    pub fn zigzag_with(self, params: ZigzagParams) -> RuleHandle<'a> {
        self.detector(Detector::Zigzag(params))
    }

    /// Double tap with default parameters.
    pub fn double_tap(self) -> RuleHandle<'a> {
        self.double_tap_with(DoubleTapParams::default())
    }

    /// Double tap with custom parameters.
    pub fn double_tap_with(self, params: DoubleTapParams) -> RuleHandle<'a> {
        self.detector(Detector::DoubleTap(params))
    }

    /// Two-finger pinch with default parameters.
    pub fn pinch(self) -> RuleHandle<'a> {
        self.pinch_with(PinchParams::default())
    }

    /// Two-finger pinch with custom parameters.
    pub fn pinch_with(self, params: PinchParams) -> RuleHandle<'a> {
        self.detector(Detector::Pinch(params))
    }

    /// Spiral with default parameters.
    pub fn spiral(self) -> RuleHandle<'a> {
        self.spiral_with(SpiralParams::default())
    }

    /// Spiral with custom parameters.
    pub fn spiral_with(self, params: SpiralParams) -> RuleHandle<'a> {
        self.detector(Detector::Spiral(params))
    }

    /// Caller-supplied detector.
    pub fn custom<F>(self, func: F) -> RuleHandle<'a>
    where
        F: Fn(&DetectorInput<'_>) -> GestureResult<DetectionResult> + 'static,
    {
        self.detector(Detector::Custom(CustomDetector::new(func)))
    }

    /// Ordered chain of detectors over successive strokes.
    pub fn sequence<I>(self, steps: I) -> RuleHandle<'a>
    where
        I: IntoIterator<Item = Detector>,
    {
        let steps = steps.into_iter().collect();
        self.register(Matcher::Sequence(SequenceRule::new(
            steps,
            DEFAULT_STEP_TIMEOUT_MS,
        )))
    }

    fn register(self, matcher: Matcher) -> RuleHandle<'a> {
        RuleHandle::from_rule(self.registry.insert(GestureRule::new(self.name, matcher)))
    }
}

/// Second half of the rule builder: refine a registered rule.
#[derive(Debug)]
pub struct RuleHandle<'a> {
    rule: &'a mut GestureRule,
}

#[allow(clippy::return_self_not_must_use)]
impl<'a> RuleHandle<'a> {
    pub(crate) fn from_rule(rule: &'a mut GestureRule) -> Self {
        Self { rule }
    }

    /// Add an acceptance predicate run after a successful detection.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&DetectionResult, &CapturedGesture) -> bool + 'static,
    {
        self.rule.condition = Some(Box::new(predicate));
        self
    }

    /// Set the callback invoked when the rule fires.
    pub fn on<F>(self, callback: F) -> Self
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        self.rule.callback = Some(Box::new(callback));
        self
    }

    /// Minimum time between two firings.
    pub fn cooldown(self, cooldown_ms: u64) -> Self {
        self.rule.cooldown_ms = cooldown_ms;
        self
    }

    /// Priority; higher wins.
    pub fn priority(self, priority: i32) -> Self {
        self.rule.priority = priority;
        self
    }

    /// Only fire when every sample falls within `area`.
    pub fn in_area(self, area: Rect) -> Self {
        self.rule.area = Some(area);
        self
    }

    /// Minimum number of concurrent touches.
    pub fn with_touches(self, touches: usize) -> Self {
        self.rule.required_touches = touches.max(1);
        self
    }

    /// Time allowed between two steps of a sequence rule.
    pub fn timeout(self, timeout_ms: u64) -> Self {
        match &mut self.rule.matcher {
            Matcher::Sequence(seq) => seq.set_timeout_ms(timeout_ms),
            Matcher::Single(_) => {
                tracing::warn!("Ignoring step timeout on non-sequence rule '{}'", self.rule.name);
            }
        }
        self
    }

    /// Name of the rule being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.rule.name
    }
}

/// Serializable rule description, as loaded from a rules file.
///
/// ```json
/// { "name": "undo", "type": "swipeLeft", "priority": 5, "cooldown_ms": 300 }
/// { "name": "confirm", "type": "sequence", "steps": ["circle", "swipe"], "timeout_ms": 800 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule name.
    pub name: String,
    /// Detector name; `sequence` for chained rules.
    #[serde(rename = "type")]
    pub detector: String,
    /// Detector parameters, in the detector's own field names.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
    /// Step detector names for sequence rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    /// Time allowed between two sequence steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Minimum time between two firings.
    #[serde(default)]
    pub cooldown_ms: u64,
    /// Priority; higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Screen area every sample must fall within.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Rect>,
    /// Minimum number of concurrent touches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touches: Option<usize>,
    /// Whether the rule starts enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl RuleSpec {
    /// Build the rule described here, without a callback.
    #[must_use]
    pub fn to_rule(&self) -> GestureRule {
        let matcher = if self.detector == "sequence" {
            let steps = self
                .steps
                .iter()
                .map(|step| Detector::from_name(step))
                .collect();
            Matcher::Sequence(SequenceRule::new(
                steps,
                self.timeout_ms.unwrap_or(DEFAULT_STEP_TIMEOUT_MS),
            ))
        } else {
            Matcher::Single(Detector::from_config(&self.detector, &self.params))
        };

        let mut rule = GestureRule::new(self.name.clone(), matcher);
        rule.cooldown_ms = self.cooldown_ms;
        rule.priority = self.priority;
        rule.area = self.area;
        if let Some(touches) = self.touches {
            rule.required_touches = touches.max(1);
        }
        rule.enabled = self.enabled;
        rule
    }
}
