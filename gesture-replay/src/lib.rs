//! # Gesture Replay
//!
//! Drives the gesture engine from a recorded session file instead of a live
//! pointer and microphone. Time comes from a manual clock that only moves
//! when the session says so, so a replay is deterministic.
//!
//! ## Usage
//!
//! ```bash
//! gesture-replay --config rules.json --session session.json
//! gesture-replay --config rules.json --list
//! ```
//!
//! ## Session format
//!
//! ```json
//! {
//!   "rules": [{"name": "next", "type": "swipeRight"}],
//!   "commands": [{"name": "save", "pattern": "zapisz", "speak": "Zapisano"}],
//!   "steps": [
//!     {"input": {"type": "Pointer", "data": {"phase": "start", "x": 0, "y": 0, "timestamp_ms": 0}}},
//!     {"advance": 200},
//!     {"say": "zapisz projekt"},
//!     {"inject": {"rule": "next"}}
//!   ]
//! }
//! ```
//!
//! Every dispatched gesture, matched command and spoken utterance becomes
//! one [`ReplayRecord`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use gesture_core::{
    DetectionResult, DetectorKind, EngineConfig, GestureEvent, InputEvent, ManualClock, Metrics,
    Recognizer, RuleSpec, SpeechSynthesizer, Utterance, VoiceCommandEvent, VoiceCommandSpec,
};
use serde::{Deserialize, Serialize};

/// Command-line arguments for gesture-replay.
#[derive(Debug, Clone, Parser)]
#[command(name = "gesture-replay")]
#[command(about = "Replay recorded input through the gesture engine")]
#[command(version)]
pub struct CliArgs {
    /// Engine configuration file (JSON)
    #[arg(long, env = "GESTURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recorded session file (JSON)
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// List registered rules and commands instead of replaying
    #[arg(long)]
    pub list: bool,

    /// Clock value at the start of the replay, in milliseconds
    #[arg(long, default_value = "0")]
    pub start_ms: u64,
}

/// One step of a recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    /// Feed an input event.
    Input(InputEvent),
    /// Move the clock forward.
    Advance(u64),
    /// Treat text as a final, fully confident transcript.
    Say(String),
    /// Dispatch a synthetic detection for a rule.
    Inject {
        /// Rule name.
        rule: String,
        /// Reported confidence.
        #[serde(default = "full_confidence")]
        confidence: f64,
    },
}

const fn full_confidence() -> f64 {
    1.0
}

/// A recorded session: extra registrations followed by the steps to play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Rules registered before the first step.
    pub rules: Vec<RuleSpec>,
    /// Voice commands registered before the first step.
    pub commands: Vec<VoiceCommandSpec>,
    /// Steps in playback order.
    pub steps: Vec<SessionStep>,
}

impl Session {
    /// Parse a session from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a session.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid session file")
    }

    /// Load a session from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Something the engine produced during a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "event", rename_all = "camelCase")]
pub enum ReplayRecord {
    /// A gesture was dispatched.
    Gesture(GestureEvent),
    /// A voice command matched.
    Command(VoiceCommandEvent),
    /// An utterance was handed to the synthesizer.
    Speech(Utterance),
}

/// Registered rule as shown by `--list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    /// Rule name.
    pub name: String,
    /// Detector archetype.
    #[serde(rename = "type")]
    pub kind: DetectorKind,
    /// Arbitration priority.
    pub priority: i32,
    /// Cooldown in milliseconds.
    pub cooldown_ms: u64,
    /// Whether the rule takes part in arbitration.
    pub enabled: bool,
}

type Records = Rc<RefCell<Vec<ReplayRecord>>>;

/// Synthesizer that records utterances instead of playing them.
struct RecordingSynthesizer(Records);

impl SpeechSynthesizer for RecordingSynthesizer {
    fn speak(&mut self, utterance: &Utterance) {
        self.0
            .borrow_mut()
            .push(ReplayRecord::Speech(utterance.clone()));
    }
}

/// A recognizer wired to a manual clock and a record sink.
pub struct Replay {
    recognizer: Recognizer,
    clock: ManualClock,
    records: Records,
}

impl Replay {
    /// Build a replay from an engine configuration.
    #[must_use]
    pub fn new(config: EngineConfig, start_ms: u64) -> Self {
        let clock = ManualClock::new(start_ms);
        let mut recognizer = Recognizer::with_clock(config, clock.clone());
        let records: Records = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&records);
        recognizer
            .gestures_mut()
            .subscribe(move |event| sink.borrow_mut().push(ReplayRecord::Gesture(event.clone())));
        let sink = Rc::clone(&records);
        recognizer
            .voice_mut()
            .subscribe(move |event| sink.borrow_mut().push(ReplayRecord::Command(event.clone())));
        recognizer
            .voice_mut()
            .set_synthesizer(Box::new(RecordingSynthesizer(Rc::clone(&records))));

        Self {
            recognizer,
            clock,
            records,
        }
    }

    /// The underlying recognizer.
    #[must_use]
    pub const fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Current clock value.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.recognizer.gestures().now_ms()
    }

    /// Register the rules and commands a session carries.
    ///
    /// # Errors
    ///
    /// Returns an error if a command pattern is invalid.
    pub fn register(&mut self, session: &Session) -> anyhow::Result<()> {
        for spec in &session.rules {
            self.recognizer.gestures_mut().register_spec(spec);
        }
        for spec in &session.commands {
            self.recognizer
                .voice_mut()
                .register_spec(spec)
                .with_context(|| format!("Voice command '{}'", spec.name))?;
        }
        Ok(())
    }

    /// Play one step.
    ///
    /// # Errors
    ///
    /// Returns an error if an injected rule does not exist.
    pub fn step(&mut self, step: &SessionStep) -> anyhow::Result<()> {
        match step {
            SessionStep::Input(event) => {
                let result = self.recognizer.process(event);
                tracing::trace!("Input at {}ms: {result:?}", self.now_ms());
            }
            SessionStep::Advance(ms) => self.clock.advance(*ms),
            SessionStep::Say(text) => {
                self.recognizer.voice_mut().simulate_transcript(text);
            }
            SessionStep::Inject { rule, confidence } => {
                let result = DetectionResult::hit(*confidence, Metrics::None);
                self.recognizer
                    .gestures_mut()
                    .inject(rule, result)
                    .with_context(|| format!("Cannot inject '{rule}'"))?;
            }
        }
        Ok(())
    }

    /// Register the session and play every step.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step.
    pub fn run(&mut self, session: &Session) -> anyhow::Result<Vec<ReplayRecord>> {
        self.register(session)?;
        for (index, step) in session.steps.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("Session step {index}"))?;
        }
        tracing::debug!(
            "Replayed {} steps, {} records",
            session.steps.len(),
            self.records.borrow().len()
        );
        Ok(self.take_records())
    }

    /// Drain everything recorded so far.
    pub fn take_records(&mut self) -> Vec<ReplayRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    /// Registered rules in registration order.
    #[must_use]
    pub fn rules(&self) -> Vec<RuleSummary> {
        self.recognizer
            .gestures()
            .rules()
            .iter()
            .map(|rule| RuleSummary {
                name: rule.name().to_string(),
                kind: rule.kind(),
                priority: rule.priority(),
                cooldown_ms: rule.cooldown_ms(),
                enabled: rule.is_enabled(),
            })
            .collect()
    }

    /// Registered voice command names in registration order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.recognizer
            .voice()
            .command_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Load the engine configuration named by the arguments.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or parsed.
pub fn load_config(args: &CliArgs) -> anyhow::Result<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_core::UtteranceId;

    fn swipe_steps() -> Vec<SessionStep> {
        let pointer = |phase: &str, x: f32, t: u64| {
            let json = format!(
                r#"{{"type":"Pointer","data":{{"phase":"{phase}","x":{x},"y":0.0,"timestamp_ms":{t}}}}}"#
            );
            SessionStep::Input(serde_json::from_str(&json).unwrap())
        };
        vec![
            pointer("start", 0.0, 0),
            pointer("move", 75.0, 100),
            SessionStep::Advance(200),
            pointer("end", 150.0, 200),
        ]
    }

    #[test]
    fn test_session_step_json() {
        let session = Session::from_json(
            r#"{"steps": [{"advance": 50}, {"say": "hello"}, {"inject": {"rule": "next"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            session.steps,
            vec![
                SessionStep::Advance(50),
                SessionStep::Say("hello".to_string()),
                SessionStep::Inject {
                    rule: "next".to_string(),
                    confidence: 1.0
                },
            ]
        );
    }

    #[test]
    fn test_replay_records_gesture() {
        let mut replay = Replay::new(EngineConfig::default(), 1000);
        let session = Session {
            rules: serde_json::from_str(r#"[{"name": "next", "type": "swipeRight"}]"#).unwrap(),
            steps: swipe_steps(),
            ..Session::default()
        };

        let records = replay.run(&session).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            ReplayRecord::Gesture(event) => {
                assert_eq!(event.name, "next");
                assert_eq!(event.timestamp_ms, 1200);
            }
            other => panic!("Expected gesture, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_command_then_acknowledgement() {
        let mut replay = Replay::new(EngineConfig::default(), 0);
        let session = Session {
            commands: vec![VoiceCommandSpec {
                name: "save".to_string(),
                pattern: "zapisz".to_string(),
                speak: Some("Zapisano".to_string()),
                speak_options: None,
            }],
            steps: vec![SessionStep::Say("Zapisz projekt".to_string())],
            ..Session::default()
        };

        let records = replay.run(&session).unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], ReplayRecord::Command(e) if e.command == "save"));
        match &records[1] {
            ReplayRecord::Speech(utterance) => {
                assert_eq!(utterance.text, "Zapisano");
                assert_eq!(utterance.id, UtteranceId(1));
            }
            other => panic!("Expected speech, got {other:?}"),
        }
    }

    #[test]
    fn test_inject_unknown_rule_fails() {
        let mut replay = Replay::new(EngineConfig::default(), 0);
        let session = Session {
            steps: vec![SessionStep::Inject {
                rule: "ghost".to_string(),
                confidence: 1.0,
            }],
            ..Session::default()
        };
        let err = replay.run(&session).unwrap_err();
        assert!(format!("{err:#}").contains("ghost"));
    }

    #[test]
    fn test_rule_listing() {
        let config = EngineConfig::from_json(
            r#"{"rules": [{"name": "delete", "type": "circle", "priority": 8, "cooldown_ms": 500}]}"#,
        )
        .unwrap();
        let replay = Replay::new(config, 0);
        assert_eq!(
            replay.rules(),
            vec![RuleSummary {
                name: "delete".to_string(),
                kind: DetectorKind::Circle,
                priority: 8,
                cooldown_ms: 500,
                enabled: true,
            }]
        );
    }

    #[test]
    fn test_record_json_shape() {
        let record = ReplayRecord::Speech(Utterance {
            id: UtteranceId(3),
            text: "ok".to_string(),
            options: gesture_core::SpeakOptions::default(),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "speech");
        assert_eq!(json["event"]["text"], "ok");
    }
}
