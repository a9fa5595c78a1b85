//! # Voice Commands
//!
//! Matches final speech transcripts against registered command patterns.
//!
//! ```text
//! VoiceEvent ─► final? ─► confidence ≥ min ─► every matching command:
//!                                               callback ─► subscribers ─► spoken ack
//! ```
//!
//! Patterns are regular expressions matched case-insensitively anywhere in
//! the transcript. Commands are checked in registration order and all
//! matching commands fire.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::VoiceConfig;
use crate::engine::SubscriptionId;
use crate::error::GestureResult;
use crate::event::VoiceEvent;
use crate::speech::{SpeakOptions, SpeechQueue, SpeechRecognizer, SpeechSynthesizer, UtteranceId};

/// A transcript that matched a registered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommandEvent {
    /// Name of the command that matched.
    pub command: String,
    /// The full (trimmed) transcript.
    pub transcript: String,
    /// Text matched by the whole pattern.
    pub matched: String,
    /// Capture groups in order; `None` for groups that did not take part.
    pub captures: Vec<Option<String>>,
    /// Recognizer confidence.
    pub confidence: f32,
    /// Engine clock time of the match.
    pub timestamp_ms: u64,
}

/// Callback invoked when a command matches.
pub type VoiceCallback = Box<dyn FnMut(&VoiceCommandEvent)>;

struct Acknowledgement {
    text: String,
    options: SpeakOptions,
}

/// A registered voice command.
pub struct VoiceCommandRule {
    name: String,
    pattern: Regex,
    callback: Option<VoiceCallback>,
    acknowledgement: Option<Acknowledgement>,
}

impl VoiceCommandRule {
    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Spoken acknowledgement text, if any.
    #[must_use]
    pub fn acknowledgement(&self) -> Option<&str> {
        self.acknowledgement.as_ref().map(|a| a.text.as_str())
    }
}

impl fmt::Debug for VoiceCommandRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceCommandRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("acknowledgement", &self.acknowledgement())
            .finish_non_exhaustive()
    }
}

/// Builder handle for a registered voice command.
#[derive(Debug)]
pub struct VoiceCommandHandle<'a> {
    rule: &'a mut VoiceCommandRule,
}

#[allow(clippy::return_self_not_must_use)]
impl VoiceCommandHandle<'_> {
    /// Set the callback invoked when the command matches.
    pub fn on<F>(self, callback: F) -> Self
    where
        F: FnMut(&VoiceCommandEvent) + 'static,
    {
        self.rule.callback = Some(Box::new(callback));
        self
    }

    /// Speak `text` (queued) after the command fires.
    pub fn speak(self, text: impl Into<String>) -> Self {
        self.speak_with(text, SpeakOptions::queued())
    }

    /// Speak `text` with explicit options after the command fires.
    pub fn speak_with(self, text: impl Into<String>, options: SpeakOptions) -> Self {
        self.rule.acknowledgement = Some(Acknowledgement {
            text: text.into(),
            options,
        });
        self
    }
}

/// Serializable voice command description, as loaded from a rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCommandSpec {
    /// Command name.
    pub name: String,
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
    /// Text spoken after the command fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speak: Option<String>,
    /// Options for the spoken acknowledgement.
    #[serde(default)]
    pub speak_options: Option<SpeakOptions>,
}

/// Subscriber notified of every matched command.
pub type VoiceListener = Box<dyn FnMut(&VoiceCommandEvent)>;

/// Voice command engine.
pub struct VoiceEngine {
    config: VoiceConfig,
    clock: Box<dyn Clock>,
    commands: Vec<VoiceCommandRule>,
    listeners: Vec<(SubscriptionId, VoiceListener)>,
    next_subscription: u64,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    listening: bool,
    warned_no_recognizer: bool,
    speech: SpeechQueue,
}

impl VoiceEngine {
    /// Create an engine with the given configuration and the system clock.
    #[must_use]
    pub fn new(config: VoiceConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create an engine with the given configuration and clock.
    #[must_use]
    pub fn with_clock(config: VoiceConfig, clock: impl Clock + 'static) -> Self {
        Self {
            speech: SpeechQueue::new(config.lang.clone()),
            config,
            clock: Box::new(clock),
            commands: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            recognizer: None,
            listening: false,
            warned_no_recognizer: false,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Install the speech recognizer.
    pub fn set_recognizer(&mut self, recognizer: Box<dyn SpeechRecognizer>) {
        self.recognizer = Some(recognizer);
        self.warned_no_recognizer = false;
    }

    /// Install the speech synthesizer.
    pub fn set_synthesizer(&mut self, synthesizer: Box<dyn SpeechSynthesizer>) {
        self.speech.set_synthesizer(synthesizer);
    }

    /// Speech output queue.
    #[must_use]
    pub const fn speech(&self) -> &SpeechQueue {
        &self.speech
    }

    // ---- Commands ----

    /// Register a command, replacing any command with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::InvalidPattern`](crate::GestureError::InvalidPattern)
    /// if `pattern` is not a valid regular expression.
    pub fn command(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> GestureResult<VoiceCommandHandle<'_>> {
        let name = name.into();
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        if self.remove(&name) {
            tracing::info!("Replacing voice command '{name}'");
        }
        tracing::debug!("Registered voice command '{name}' /{}/i", pattern.as_str());
        self.commands.push(VoiceCommandRule {
            name,
            pattern,
            callback: None,
            acknowledgement: None,
        });
        let index = self.commands.len() - 1;
        Ok(VoiceCommandHandle {
            rule: &mut self.commands[index],
        })
    }

    /// Register a command described by a [`VoiceCommandSpec`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid.
    pub fn register_spec(&mut self, spec: &VoiceCommandSpec) -> GestureResult<VoiceCommandHandle<'_>> {
        let handle = self.command(spec.name.clone(), &spec.pattern)?;
        Ok(match &spec.speak {
            Some(text) => {
                let options = spec.speak_options.clone().unwrap_or_else(SpeakOptions::queued);
                handle.speak_with(text.clone(), options)
            }
            None => handle,
        })
    }

    /// Remove a command. Returns `false` for unknown names.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.commands.len();
        self.commands.retain(|c| c.name != name);
        self.commands.len() != before
    }

    /// Look up a command.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VoiceCommandRule> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Command names in registration order.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    // ---- Subscribers ----

    /// Register a subscriber notified after the callback of every matched
    /// command.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&VoiceCommandEvent) + 'static,
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

    // ---- Recognition ----

    /// Start the recognizer.
    ///
    /// Returns `false`, after a single warning, when no recognizer is
    /// installed or it refuses to start.
    pub fn start_listening(&mut self) -> bool {
        let Some(recognizer) = self.recognizer.as_mut() else {
            if !self.warned_no_recognizer {
                tracing::warn!("Speech recognition unavailable; voice commands are disabled");
                self.warned_no_recognizer = true;
            }
            return false;
        };
        match recognizer.start(&self.config) {
            Ok(()) => {
                tracing::info!("Listening for voice commands ({})", self.config.lang);
                self.listening = true;
                true
            }
            Err(e) => {
                tracing::warn!("Speech recognition failed to start: {e}");
                self.listening = false;
                false
            }
        }
    }

    /// Stop the recognizer.
    pub fn stop_listening(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.listening = false;
    }

    /// Check if the recognizer is running.
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    /// Match a recognizer result against every command.
    ///
    /// Interim results and results below the configured confidence are
    /// ignored. Returns the matched commands in registration order.
    pub fn handle_transcript(&mut self, event: &VoiceEvent) -> Vec<VoiceCommandEvent> {
        if !event.is_final {
            tracing::trace!("Ignoring interim transcript");
            return Vec::new();
        }
        if event.confidence < self.config.min_confidence {
            tracing::debug!(
                "Ignoring transcript below confidence threshold ({} < {})",
                event.confidence,
                self.config.min_confidence
            );
            return Vec::new();
        }

        let transcript = event.transcript.trim();
        let now = self.clock.now_ms();
        let mut fired = Vec::new();
        for rule in &mut self.commands {
            let Some(caps) = rule.pattern.captures(transcript) else {
                continue;
            };
            let event = VoiceCommandEvent {
                command: rule.name.clone(),
                transcript: transcript.to_string(),
                matched: caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                captures: caps
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect(),
                confidence: event.confidence,
                timestamp_ms: now,
            };
            tracing::info!("Voice command '{}' matched \"{}\"", rule.name, event.matched);

            if let Some(callback) = rule.callback.as_mut() {
                callback(&event);
            }
            for (_, listener) in &mut self.listeners {
                listener(&event);
            }
            if let Some(ack) = &rule.acknowledgement {
                self.speech.speak(ack.text.clone(), ack.options.clone());
            }
            fired.push(event);
        }

        if fired.is_empty() {
            tracing::debug!("No voice command matched \"{transcript}\"");
        }
        fired
    }

    /// Treat `text` as a final, fully confident transcript.
    pub fn simulate_transcript(&mut self, text: &str) -> Vec<VoiceCommandEvent> {
        let event = VoiceEvent::final_result(text.to_string(), 1.0, self.clock.now_ms());
        self.handle_transcript(&event)
    }

    // ---- Speech output ----

    /// Speak `text`.
    pub fn speak(&mut self, text: impl Into<String>, options: SpeakOptions) -> Option<UtteranceId> {
        self.speech.speak(text, options)
    }

    /// The synthesizer finished an utterance.
    pub fn utterance_finished(&mut self, id: UtteranceId) {
        self.speech.utterance_finished(id);
    }

    /// Drop pending speech and stop the synthesizer.
    pub fn cancel_speech(&mut self) {
        self.speech.cancel();
    }
}

impl Default for VoiceEngine {
    fn default() -> Self {
        Self::new(VoiceConfig::default())
    }
}

impl fmt::Debug for VoiceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceEngine")
            .field("config", &self.config)
            .field("commands", &self.command_names())
            .field("listening", &self.listening)
            .field("speech", &self.speech)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::GestureError;

    fn engine() -> VoiceEngine {
        VoiceEngine::with_clock(VoiceConfig::default(), crate::clock::ManualClock::new(500))
    }

    #[test]
    fn test_case_insensitive_match() {
        let mut voice = engine();
        voice.command("save", "zapisz|save").unwrap();
        let fired = voice.simulate_transcript("  Please SAVE this ");
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].command, "save");
        assert_eq!(fired[0].matched, "SAVE");
        assert_eq!(fired[0].transcript, "Please SAVE this");
        assert_eq!(fired[0].timestamp_ms, 500);
    }

    #[test]
    fn test_all_matching_commands_fire_in_order() {
        let mut voice = engine();
        voice.command("any", ".").unwrap();
        voice.command("delete", "usuń|delete").unwrap();
        voice.command("save", "save").unwrap();
        let fired = voice.simulate_transcript("delete it");
        let names: Vec<&str> = fired.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(names, vec!["any", "delete"]);
    }

    #[test]
    fn test_captures() {
        let mut voice = engine();
        voice.command("color", r"make (\w+) (red|blue)( now)?").unwrap();
        let fired = voice.simulate_transcript("make this red");
        assert_eq!(
            fired[0].captures,
            vec![Some("this".to_string()), Some("red".to_string()), None]
        );
    }

    #[test]
    fn test_interim_and_low_confidence_ignored() {
        let mut voice = VoiceEngine::new(VoiceConfig {
            min_confidence: 0.6,
            ..VoiceConfig::default()
        });
        voice.command("save", "save").unwrap();
        assert!(voice
            .handle_transcript(&VoiceEvent::interim("save".into(), 0.9, 0))
            .is_empty());
        assert!(voice
            .handle_transcript(&VoiceEvent::final_result("save".into(), 0.4, 0))
            .is_empty());
        assert_eq!(
            voice
                .handle_transcript(&VoiceEvent::final_result("save".into(), 0.8, 0))
                .len(),
            1
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let mut voice = engine();
        assert!(matches!(
            voice.command("bad", "(unclosed"),
            Err(GestureError::InvalidPattern(_))
        ));
        assert!(voice.command_names().is_empty());
    }

    #[test]
    fn test_callback_then_subscriber() {
        let mut voice = engine();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        voice
            .command("save", "save")
            .unwrap()
            .on(move |e| l1.borrow_mut().push(format!("cb:{}", e.command)));
        let l2 = Rc::clone(&log);
        let id = voice.subscribe(move |e| l2.borrow_mut().push(format!("sub:{}", e.command)));
        voice.simulate_transcript("save");
        assert_eq!(*log.borrow(), vec!["cb:save", "sub:save"]);

        assert!(voice.unsubscribe(id));
        voice.simulate_transcript("save");
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut voice = engine();
        voice.command("save", "save").unwrap();
        voice.command("undo", "undo").unwrap();
        voice.command("save", "store").unwrap();
        assert_eq!(voice.command_names(), vec!["undo", "save"]);
        assert!(voice.simulate_transcript("save").is_empty());
        assert!(voice.remove("undo"));
        assert!(!voice.remove("undo"));
    }

    #[test]
    fn test_listening_without_recognizer() {
        let mut voice = engine();
        assert!(!voice.start_listening());
        assert!(!voice.is_listening());
    }

    #[test]
    fn test_spec_registers_acknowledgement() {
        let mut voice = engine();
        let spec: VoiceCommandSpec =
            serde_json::from_str(r#"{"name":"save","pattern":"zapisz","speak":"Zapisano"}"#).unwrap();
        voice.register_spec(&spec).unwrap();
        assert_eq!(voice.get("save").unwrap().acknowledgement(), Some("Zapisano"));
    }
}
