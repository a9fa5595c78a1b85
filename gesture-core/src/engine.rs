//! # Gesture Engine
//!
//! Owns stroke capture, the rule registry and the subscribers, and runs the
//! arbitration pass each time a stroke finishes.
//!
//! ```text
//! ┌──────────────┐  stroke   ┌─────────────────────────────────────────┐
//! │ StrokeCapture│ ────────► │ Arbitration                             │
//! └──────────────┘           │  enabled ─► area/touch gate ─► ranked   │
//!                            │  detect ─► condition ─► cooldown        │
//!                            │  short-circuit above the threshold      │
//!                            └──────────────────┬──────────────────────┘
//!                                               │ passing rules
//!                                               ▼
//!                                 callback, then every subscriber
//! ```
//!
//! Every passing rule is stamped before any callback runs, so a callback
//! that feeds new input sees consistent cooldowns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::{CapturedGesture, StrokeCapture};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::detector::{DetectionResult, DetectorInput, DetectorKind};
use crate::error::{GestureError, GestureResult};
use crate::event::{Sample, TouchEvent};
use crate::rule::{GestureRule, GestureSelector, Matcher, RuleHandle, RuleRegistry, RuleSpec};

/// A recognized gesture, as delivered to callbacks and subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    /// Name of the rule that fired.
    pub name: String,
    /// Archetype of the rule's detector.
    #[serde(rename = "type")]
    pub kind: DetectorKind,
    /// Detector output.
    pub result: DetectionResult,
    /// Samples of the primary stroke.
    pub points: Vec<Sample>,
    /// Engine clock time of the dispatch.
    pub timestamp_ms: u64,
    /// Priority of the rule.
    pub priority: i32,
}

/// Where the engine is in its stroke cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationPhase {
    /// No stroke open.
    Idle,
    /// A stroke is being captured.
    Capturing,
    /// Rules are being evaluated against a finished stroke.
    Evaluating,
    /// Callbacks and subscribers are running.
    Dispatching,
}

/// Handle returned by [`GestureEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next(counter: &mut u64) -> Self {
        let id = Self(*counter);
        *counter += 1;
        id
    }
}

/// Subscriber notified of every dispatched gesture.
pub type GestureListener = Box<dyn FnMut(&GestureEvent)>;

struct TapHistory {
    samples: Vec<Sample>,
    ended_ms: u64,
}

/// Gesture recognition and arbitration engine.
pub struct GestureEngine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    capture: StrokeCapture,
    registry: RuleRegistry,
    listeners: Vec<(SubscriptionId, GestureListener)>,
    next_subscription: u64,
    phase: ArbitrationPhase,
    tap_history: Option<TapHistory>,
}

impl GestureEngine {
    /// Create an engine with default configuration and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration and the system clock.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create an engine with the given configuration and clock.
    ///
    /// Rules listed in the configuration are registered without callbacks;
    /// their events reach subscribers only.
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let mut registry = RuleRegistry::new();
        for spec in &config.rules {
            registry.insert(spec.to_rule());
        }
        Self {
            capture: StrokeCapture::new(config.capture.max_stroke_points),
            config,
            clock: Box::new(clock),
            registry,
            listeners: Vec::new(),
            next_subscription: 0,
            phase: ArbitrationPhase::Idle,
            tap_history: None,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current time on the engine clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Where the engine is in its stroke cycle.
    #[must_use]
    pub fn phase(&self) -> ArbitrationPhase {
        if self.phase == ArbitrationPhase::Idle && self.capture.is_capturing() {
            ArbitrationPhase::Capturing
        } else {
            self.phase
        }
    }

    /// Stroke capture state.
    #[must_use]
    pub const fn capture(&self) -> &StrokeCapture {
        &self.capture
    }

    // ---- Rules ----

    /// Start building a rule. The rule is registered once a detector is
    /// chosen on the returned selector.
    pub fn gesture(&mut self, name: impl Into<String>) -> GestureSelector<'_> {
        GestureSelector::new(&mut self.registry, name)
    }

    /// Register a rule described by a [`RuleSpec`].
    pub fn register_spec(&mut self, spec: &RuleSpec) -> RuleHandle<'_> {
        let rule = self.registry.insert(spec.to_rule());
        RuleHandle::from_rule(rule)
    }

    /// Register a prebuilt rule.
    pub fn register(&mut self, rule: GestureRule) -> RuleHandle<'_> {
        RuleHandle::from_rule(self.registry.insert(rule))
    }

    /// Look up a rule.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&GestureRule> {
        self.registry.get(name)
    }

    /// Rule registry.
    #[must_use]
    pub const fn rules(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Rule names in registration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Enable a rule. Returns `false` for unknown names.
    pub fn enable(&mut self, name: &str) -> bool {
        self.registry.set_enabled(name, true)
    }

    /// Disable a rule. Returns `false` for unknown names.
    pub fn disable(&mut self, name: &str) -> bool {
        self.registry.set_enabled(name, false)
    }

    /// Remove a rule. Returns `false` for unknown names.
    pub fn remove(&mut self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Remove every rule.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.tap_history = None;
    }

    // ---- Subscribers ----

    /// Register a subscriber notified after the rule callback of every
    /// dispatched gesture.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        let id = SubscriptionId::next(&mut self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ---- Capture ----

    /// Pointer down: open a stroke, discarding any stroke in progress.
    pub fn begin_stroke(&mut self, sample: Sample) {
        self.capture.begin_stroke(sample);
    }

    /// Pointer move: extend the open stroke.
    pub fn append_sample(&mut self, sample: Sample) {
        self.capture.append_sample(sample);
    }

    /// Pointer up: close the stroke and run arbitration.
    ///
    /// Returns the dispatched events, highest priority first.
    pub fn end_stroke(&mut self) -> Vec<GestureEvent> {
        match self.capture.end_stroke() {
            Some(gesture) => self.evaluate(&gesture),
            None => Vec::new(),
        }
    }

    /// Discard the stroke in progress without evaluating it.
    pub fn cancel_stroke(&mut self) {
        self.capture.cancel();
    }

    /// A pointer went down (multi-touch aware).
    pub fn pointer_down(&mut self, pointer_id: u32, sample: Sample) {
        self.capture.pointer_down(pointer_id, sample);
    }

    /// A pointer moved (multi-touch aware).
    pub fn pointer_move(&mut self, pointer_id: u32, sample: Sample) {
        self.capture.pointer_move(pointer_id, sample);
    }

    /// A pointer lifted. Runs arbitration once the last pointer is up.
    pub fn pointer_up(&mut self, pointer_id: u32, sample: Option<Sample>) -> Vec<GestureEvent> {
        match self.capture.pointer_up(pointer_id, sample) {
            Some(gesture) => self.evaluate(&gesture),
            None => Vec::new(),
        }
    }

    /// Feed a touch event. Runs arbitration when the last finger lifts.
    pub fn process_touch(&mut self, event: &TouchEvent) -> Vec<GestureEvent> {
        match self.capture.process_touch(event) {
            Some(gesture) => self.evaluate(&gesture),
            None => Vec::new(),
        }
    }

    // ---- Arbitration ----

    /// Run the arbitration pass over a captured gesture and dispatch every
    /// passing rule.
    pub fn evaluate(&mut self, gesture: &CapturedGesture) -> Vec<GestureEvent> {
        self.phase = ArbitrationPhase::Evaluating;
        let now = self.clock.now_ms();
        let points = gesture.primary.samples();

        let previous = match &self.tap_history {
            Some(prev)
                if gesture.touch_count == 1
                    && now.saturating_sub(prev.ended_ms)
                        <= self.config.arbitration.tap_history_ms =>
            {
                Some(prev.samples.as_slice())
            }
            _ => None,
        };
        let input = DetectorInput::new(points)
            .with_pair(gesture.touch_pair())
            .with_previous_stroke(previous);

        // Sequence progress advances on every stroke, whatever wins below.
        let mut completed: Vec<Option<DetectionResult>> = Vec::with_capacity(self.registry.len());
        for rule in self.registry.rules_mut() {
            let hit = match &mut rule.matcher {
                Matcher::Sequence(seq) if rule.enabled => seq.advance(&input, now),
                _ => None,
            };
            completed.push(hit);
        }

        let threshold = self.config.arbitration.short_circuit_priority;
        let mut passing: Vec<(usize, DetectionResult)> = Vec::new();
        for index in self.registry.ranked() {
            let rule = &self.registry.rules()[index];
            if !rule.admits(gesture) {
                tracing::trace!("Rule '{}' gated out", rule.name());
                continue;
            }
            let result = match rule.matcher() {
                Matcher::Single(_) => rule.detect(&input),
                Matcher::Sequence(_) => completed[index].take().unwrap_or_default(),
            };
            if !result.detected || !rule.passes_condition(&result, gesture) {
                continue;
            }
            if rule.is_cooling_down(now) {
                tracing::debug!("Rule '{}' suppressed by cooldown", rule.name());
                continue;
            }

            let short_circuit = rule.priority() > threshold;
            passing.push((index, result));
            if short_circuit {
                tracing::debug!(
                    "Rule '{}' (priority {}) short-circuits arbitration",
                    rule.name(),
                    rule.priority()
                );
                break;
            }
        }

        for (index, _) in &passing {
            self.registry.rules_mut()[*index].last_triggered_ms = Some(now);
        }

        let consumed_taps = passing
            .iter()
            .any(|(i, _)| self.registry.rules()[*i].kind() == DetectorKind::DoubleTap);
        self.tap_history = if consumed_taps || gesture.touch_count != 1 {
            None
        } else {
            Some(TapHistory {
                samples: points.to_vec(),
                ended_ms: now,
            })
        };

        self.phase = ArbitrationPhase::Dispatching;
        let mut events = Vec::with_capacity(passing.len());
        for (index, result) in passing {
            let rule = &mut self.registry.rules_mut()[index];
            let event = GestureEvent {
                name: rule.name.clone(),
                kind: rule.kind(),
                result,
                points: points.to_vec(),
                timestamp_ms: now,
                priority: rule.priority,
            };
            tracing::info!("Gesture '{}' ({}) recognized", event.name, event.kind);
            if let Some(callback) = rule.callback.as_mut() {
                callback(&event);
            }
            Self::notify(&mut self.listeners, &event);
            events.push(event);
        }

        self.phase = ArbitrationPhase::Idle;
        events
    }

    /// Dispatch a synthetic detection for a registered rule, bypassing
    /// capture and arbitration. Cooldown and enablement are not checked.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::RuleNotFound`] for unknown names.
    pub fn inject(&mut self, name: &str, result: DetectionResult) -> GestureResult<GestureEvent> {
        let now = self.clock.now_ms();
        let rule = self
            .registry
            .get_mut(name)
            .ok_or_else(|| GestureError::RuleNotFound(name.to_string()))?;
        rule.last_triggered_ms = Some(now);
        let event = GestureEvent {
            name: rule.name.clone(),
            kind: rule.kind(),
            result,
            points: Vec::new(),
            timestamp_ms: now,
            priority: rule.priority,
        };
        tracing::debug!("Injected gesture '{name}'");
        if let Some(callback) = rule.callback.as_mut() {
            callback(&event);
        }
        Self::notify(&mut self.listeners, &event);
        Ok(event)
    }

    fn notify(listeners: &mut [(SubscriptionId, GestureListener)], event: &GestureEvent) {
        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }
    }
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GestureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureEngine")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("rules", &self.registry.names())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
