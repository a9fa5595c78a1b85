//! # Gesture Core
//!
//! Gesture recognition and arbitration for pen, mouse and touch input, with
//! voice commands alongside. Compiles to WASM for the browser editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               gesture-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Capture          │  Detectors              │
//! │  - Strokes        │  - circle, swipe, line  │
//! │  - Touch pairs    │  - zigzag, doubleTap    │
//! │  - Sliding window │  - pinch, spiral, custom│
//! ├─────────────────────────────────────────────┤
//! │  Rules            │  Engine                 │
//! │  - Builder        │  - Arbitration          │
//! │  - Sequences      │  - Cooldowns, priority  │
//! │  - Gating         │  - Dispatch             │
//! ├─────────────────────────────────────────────┤
//! │  Voice            │  Recognizer             │
//! │  - Commands       │  - Input routing        │
//! │  - Speech queue   │  - Voice + gesture      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine is single-threaded: callbacks are plain closures and run on
//! the thread that feeds input.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod clock;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod event;
pub mod fusion;
pub mod geometry;
pub mod rule;
pub mod sequence;
pub mod speech;
pub mod voice;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use capture::{CapturedGesture, Stroke, StrokeCapture, TouchPair};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ArbitrationConfig, CaptureConfig, EngineConfig, FusionConfig, VoiceConfig};
pub use detector::{
    CircleParams, CustomDetector, DetectionResult, Detector, DetectorInput, DetectorKind,
    DoubleTapParams, LineParams, Metrics, PinchParams, SpiralParams, SwipeDirection, SwipeParams,
    ZigzagParams,
};
pub use engine::{ArbitrationPhase, GestureEngine, GestureEvent, SubscriptionId};
pub use error::{GestureError, GestureResult};
pub use event::{InputEvent, Sample, TouchEvent, TouchPhase, TouchPoint, VoiceEvent};
pub use fusion::{FusionResult, InteractionBuilder, InteractionTrigger, Recognizer};
pub use geometry::{Point, Rect};
pub use rule::{GestureRule, GestureSelector, Matcher, RuleHandle, RuleRegistry, RuleSpec};
pub use sequence::SequenceRule;
pub use speech::{
    SpeakOptions, SpeechQueue, SpeechRecognizer, SpeechSynthesizer, Utterance, UtteranceId,
};
pub use voice::{VoiceCommandEvent, VoiceCommandHandle, VoiceCommandSpec, VoiceEngine};

/// Gesture core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
