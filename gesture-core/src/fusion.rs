//! # Multi-Modal Recognizer
//!
//! Combines the gesture engine and the voice engine behind one input entry
//! point, and lets a single callback answer to either modality.
//!
//! ```text
//! InputEvent ─┬─ Pointer / Touch ─► GestureEngine ─► FusionResult::Gestures
//!             ├─ Voice ───────────► VoiceEngine ───► FusionResult::Commands
//!             └─ UtteranceEnd ────► speech queue
//! ```
//!
//! An interaction registers a voice command and a gesture rule under the
//! same name, both wired to the same callback:
//!
//! ```rust,ignore
//! recognizer
//!     .interaction("delete")
//!     .when_saying("usuń|delete")
//!     .while_gesturing(Detector::from_name("zigzag"))
//!     .then(|trigger| println!("delete via {}", trigger.modality()))?;
//! ```
//!
//! By default either half fires the callback on its own. With
//! [`InteractionBuilder::within`] the callback only fires when both halves
//! land within the window, in either order; each pending half is consumed
//! by the fusion.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::detector::Detector;
use crate::engine::{GestureEngine, GestureEvent};
use crate::error::GestureResult;
use crate::event::{InputEvent, Sample, TouchPhase};
use crate::rule::GestureSelector;
use crate::speech::UtteranceId;
use crate::voice::{VoiceCommandEvent, VoiceCommandHandle, VoiceEngine};

/// What triggered an interaction callback.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionTrigger {
    /// The voice half matched.
    Voice(VoiceCommandEvent),
    /// The gesture half was recognized.
    Gesture(GestureEvent),
}

impl InteractionTrigger {
    /// `"voice"` or `"gesture"`.
    #[must_use]
    pub const fn modality(&self) -> &'static str {
        match self {
            Self::Voice(_) => "voice",
            Self::Gesture(_) => "gesture",
        }
    }

    /// Engine clock time of the triggering event.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Voice(event) => event.timestamp_ms,
            Self::Gesture(event) => event.timestamp_ms,
        }
    }
}

/// Result of processing one input event.
#[derive(Debug, Clone, PartialEq)]
pub enum FusionResult {
    /// A stroke finished and these gestures were dispatched.
    Gestures(Vec<GestureEvent>),
    /// A transcript matched these commands.
    Commands(Vec<VoiceCommandEvent>),
    /// Input was buffered (stroke in progress).
    Pending,
    /// Nothing recognized.
    None,
}

impl FusionResult {
    fn from_gestures(events: Vec<GestureEvent>) -> Self {
        if events.is_empty() {
            Self::None
        } else {
            Self::Gestures(events)
        }
    }

    fn from_commands(events: Vec<VoiceCommandEvent>) -> Self {
        if events.is_empty() {
            Self::None
        } else {
            Self::Commands(events)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Modality {
    Voice,
    Gesture,
}

/// Pending halves of a coincidence-gated interaction.
#[derive(Debug)]
struct CoincidenceGate {
    window_ms: u64,
    pending_voice: Option<u64>,
    pending_gesture: Option<u64>,
}

impl CoincidenceGate {
    const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            pending_voice: None,
            pending_gesture: None,
        }
    }

    /// Record one half. Returns `true` when it completes a pair.
    fn admit(&mut self, modality: Modality, at_ms: u64) -> bool {
        let window = self.window_ms;
        let (own, other) = match modality {
            Modality::Voice => (&mut self.pending_voice, &mut self.pending_gesture),
            Modality::Gesture => (&mut self.pending_gesture, &mut self.pending_voice),
        };
        if other.is_some_and(|t| at_ms.abs_diff(t) <= window) {
            *own = None;
            *other = None;
            true
        } else {
            *own = Some(at_ms);
            false
        }
    }
}

type InteractionCallback = Rc<RefCell<Box<dyn FnMut(&InteractionTrigger)>>>;

/// Builder for a voice + gesture interaction.
pub struct InteractionBuilder<'a> {
    recognizer: &'a mut Recognizer,
    name: String,
    pattern: Option<String>,
    detector: Option<Detector>,
    window_ms: Option<u64>,
}

impl InteractionBuilder<'_> {
    /// Voice half: a case-insensitive pattern.
    #[must_use]
    pub fn when_saying(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Gesture half.
    #[must_use]
    pub fn while_gesturing(mut self, detector: Detector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Only fire when both halves land within `window_ms` of each other.
    #[must_use]
    pub fn within(mut self, window_ms: u64) -> Self {
        self.window_ms = Some(window_ms);
        self
    }

    /// Like [`within`](Self::within), using the configured fusion window.
    #[must_use]
    pub fn coincident(self) -> Self {
        let window = self.recognizer.config.fusion.window_ms;
        self.within(window)
    }

    /// Register both halves with `callback`.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::InvalidPattern`](crate::GestureError::InvalidPattern)
    /// if the voice pattern is invalid. Nothing is registered in that case.
    pub fn then<F>(self, callback: F) -> GestureResult<()>
    where
        F: FnMut(&InteractionTrigger) + 'static,
    {
        let Self {
            recognizer,
            name,
            pattern,
            detector,
            window_ms,
        } = self;

        if pattern.is_none() || detector.is_none() {
            tracing::warn!("Interaction '{name}' has only one modality");
        }

        let callback: InteractionCallback = Rc::new(RefCell::new(Box::new(callback)));
        let gate = window_ms.map(|w| Rc::new(RefCell::new(CoincidenceGate::new(w))));
        let fire = move |modality: Modality, trigger: InteractionTrigger| {
            let admitted = gate
                .as_ref()
                .map_or(true, |g| g.borrow_mut().admit(modality, trigger.timestamp_ms()));
            if admitted {
                let mut callback = callback.borrow_mut();
                (*callback)(&trigger);
            }
        };

        if let Some(pattern) = pattern {
            let fire = fire.clone();
            recognizer
                .voice
                .command(name.clone(), &pattern)?
                .on(move |event| fire(Modality::Voice, InteractionTrigger::Voice(event.clone())));
        }
        if let Some(detector) = detector {
            recognizer
                .gestures
                .gesture(name)
                .detector(detector)
                .on(move |event| fire(Modality::Gesture, InteractionTrigger::Gesture(event.clone())));
        }
        Ok(())
    }
}

impl fmt::Debug for InteractionBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionBuilder")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("detector", &self.detector)
            .field("window_ms", &self.window_ms)
            .finish_non_exhaustive()
    }
}

/// Gesture and voice recognition behind one input entry point.
#[derive(Debug)]
pub struct Recognizer {
    config: EngineConfig,
    gestures: GestureEngine,
    voice: VoiceEngine,
}

impl Recognizer {
    /// Create a recognizer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a recognizer with the given configuration and the system
    /// clock.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a recognizer whose engines share `clock`.
    ///
    /// Gesture rules and voice commands listed in the configuration are
    /// registered. Commands with invalid patterns are skipped with a
    /// warning.
    #[must_use]
    pub fn with_clock<C>(config: EngineConfig, clock: C) -> Self
    where
        C: Clock + Clone + 'static,
    {
        let gestures = GestureEngine::with_clock(config.clone(), clock.clone());
        let mut voice = VoiceEngine::with_clock(config.voice.clone(), clock);
        for spec in &config.commands {
            if let Err(e) = voice.register_spec(spec) {
                tracing::warn!("Skipping voice command '{}': {e}", spec.name);
            }
        }
        Self {
            config,
            gestures,
            voice,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The gesture engine.
    #[must_use]
    pub const fn gestures(&self) -> &GestureEngine {
        &self.gestures
    }

    /// The gesture engine, mutably.
    pub fn gestures_mut(&mut self) -> &mut GestureEngine {
        &mut self.gestures
    }

    /// The voice engine.
    #[must_use]
    pub const fn voice(&self) -> &VoiceEngine {
        &self.voice
    }

    /// The voice engine, mutably.
    pub fn voice_mut(&mut self) -> &mut VoiceEngine {
        &mut self.voice
    }

    /// Start building a gesture rule.
    pub fn gesture(&mut self, name: impl Into<String>) -> GestureSelector<'_> {
        self.gestures.gesture(name)
    }

    /// Register a voice command.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn command(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> GestureResult<VoiceCommandHandle<'_>> {
        self.voice.command(name, pattern)
    }

    /// Start building a voice + gesture interaction.
    pub fn interaction(&mut self, name: impl Into<String>) -> InteractionBuilder<'_> {
        InteractionBuilder {
            recognizer: self,
            name: name.into(),
            pattern: None,
            detector: None,
            window_ms: None,
        }
    }

    /// Enable a gesture rule.
    pub fn enable(&mut self, name: &str) -> bool {
        self.gestures.enable(name)
    }

    /// Disable a gesture rule.
    pub fn disable(&mut self, name: &str) -> bool {
        self.gestures.disable(name)
    }

    /// Process any input event.
    pub fn process(&mut self, event: &InputEvent) -> FusionResult {
        match event {
            InputEvent::Touch(touch) => {
                let events = self.gestures.process_touch(touch);
                if events.is_empty() && self.gestures.capture().is_capturing() {
                    FusionResult::Pending
                } else {
                    FusionResult::from_gestures(events)
                }
            }
            InputEvent::Pointer {
                phase,
                x,
                y,
                timestamp_ms,
            } => self.process_pointer(*phase, Sample::new(f64::from(*x), f64::from(*y), *timestamp_ms)),
            InputEvent::Voice(voice) => FusionResult::from_commands(self.voice.handle_transcript(voice)),
            InputEvent::UtteranceEnd { id } => {
                self.voice.utterance_finished(UtteranceId(*id));
                FusionResult::None
            }
        }
    }

    fn process_pointer(&mut self, phase: TouchPhase, sample: Sample) -> FusionResult {
        match phase {
            TouchPhase::Start => {
                self.gestures.begin_stroke(sample);
                FusionResult::Pending
            }
            TouchPhase::Move => {
                if !self.gestures.capture().is_capturing() {
                    return FusionResult::None;
                }
                self.gestures.append_sample(sample);
                FusionResult::Pending
            }
            TouchPhase::End => {
                self.gestures.append_sample(sample);
                FusionResult::from_gestures(self.gestures.end_stroke())
            }
            TouchPhase::Cancel => {
                self.gestures.cancel_stroke();
                FusionResult::None
            }
        }
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}
