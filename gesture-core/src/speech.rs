//! # Speech Output
//!
//! Platform speech capabilities sit behind two traits so the engine can run
//! headless, in a browser through `wasm`, or against fakes in tests.
//!
//! Queued utterances play strictly one at a time:
//!
//! ```text
//! speak(queue) ─► pending ─► in flight ─► utterance_finished(id) ─► next
//! ```
//!
//! Utterances spoken without `queue` go straight to the synthesizer and do
//! not touch the queue.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VoiceConfig;
use crate::error::GestureResult;

/// Identifier of a spoken utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

/// How an utterance is spoken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakOptions {
    /// Speaking rate, 1.0 is normal.
    pub rate: f32,
    /// Pitch, 1.0 is normal.
    pub pitch: f32,
    /// Volume in `[0, 1]`.
    pub volume: f32,
    /// Locale; the voice configuration's locale when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Wait for earlier queued utterances instead of speaking immediately.
    pub queue: bool,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            lang: None,
            queue: false,
        }
    }
}

impl SpeakOptions {
    /// Default options with queueing on.
    #[must_use]
    pub fn queued() -> Self {
        Self {
            queue: true,
            ..Self::default()
        }
    }
}

/// One piece of text handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Identifier reported back through `utterance_finished`.
    pub id: UtteranceId,
    /// Text to speak.
    pub text: String,
    /// Resolved options; `lang` is always set.
    pub options: SpeakOptions,
}

/// Text-to-speech capability.
pub trait SpeechSynthesizer {
    /// Start speaking. Completion is reported through
    /// [`SpeechQueue::utterance_finished`].
    fn speak(&mut self, utterance: &Utterance);

    /// Stop whatever is being spoken.
    fn cancel(&mut self) {}
}

/// Speech recognition capability.
pub trait SpeechRecognizer {
    /// Start delivering transcripts.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses to start recognition.
    fn start(&mut self, config: &VoiceConfig) -> GestureResult<()>;

    /// Stop delivering transcripts.
    fn stop(&mut self);
}

/// FIFO of utterances with at most one queued utterance in flight.
pub struct SpeechQueue {
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    pending: VecDeque<Utterance>,
    in_flight: Option<UtteranceId>,
    next_id: u64,
    default_lang: String,
    warned_unavailable: bool,
}

impl SpeechQueue {
    /// Create a queue without a synthesizer.
    #[must_use]
    pub fn new(default_lang: impl Into<String>) -> Self {
        Self {
            synthesizer: None,
            pending: VecDeque::new(),
            in_flight: None,
            next_id: 1,
            default_lang: default_lang.into(),
            warned_unavailable: false,
        }
    }

    /// Install the synthesizer.
    pub fn set_synthesizer(&mut self, synthesizer: Box<dyn SpeechSynthesizer>) {
        self.synthesizer = Some(synthesizer);
        self.warned_unavailable = false;
    }

    /// Check if a synthesizer is installed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Queued utterance currently being spoken.
    #[must_use]
    pub const fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    /// Number of queued utterances waiting to be spoken.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Speak `text`.
    ///
    /// Returns `None`, after a single warning, when no synthesizer is
    /// installed.
    pub fn speak(&mut self, text: impl Into<String>, mut options: SpeakOptions) -> Option<UtteranceId> {
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            if !self.warned_unavailable {
                tracing::warn!("Speech synthesis unavailable; utterances are dropped");
                self.warned_unavailable = true;
            }
            return None;
        };

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        if options.lang.is_none() {
            options.lang = Some(self.default_lang.clone());
        }
        let utterance = Utterance {
            id,
            text: text.into(),
            options,
        };

        if utterance.options.queue {
            tracing::debug!("Queued utterance {} ({} pending)", id.0, self.pending.len());
            self.pending.push_back(utterance);
            self.start_next();
        } else {
            synthesizer.speak(&utterance);
        }
        Some(id)
    }

    /// The synthesizer finished an utterance. Starts the next queued one.
    pub fn utterance_finished(&mut self, id: UtteranceId) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
            self.start_next();
        } else {
            tracing::trace!("Ignoring completion of unqueued utterance {}", id.0);
        }
    }

    /// Drop every pending utterance and stop the synthesizer.
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.in_flight = None;
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            synthesizer.cancel();
        }
    }

    fn start_next(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return;
        };
        if let Some(next) = self.pending.pop_front() {
            synthesizer.speak(&next);
            self.in_flight = Some(next.id);
        }
    }
}

impl fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("available", &self.is_available())
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
