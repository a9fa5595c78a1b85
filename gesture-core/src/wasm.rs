//! WebAssembly bindings for gesture-core.
//!
//! Events cross the boundary as JSON strings. Speech capabilities are
//! provided by the host page as plain JavaScript functions.

use js_sys::Function;
use wasm_bindgen::prelude::*;

use crate::clock::Clock;
use crate::config::{EngineConfig, VoiceConfig};
use crate::error::{GestureError, GestureResult};
use crate::event::{InputEvent, Sample, VoiceEvent};
use crate::fusion::Recognizer;
use crate::rule::RuleSpec;
use crate::speech::{SpeechRecognizer, SpeechSynthesizer, Utterance, UtteranceId};
use crate::voice::VoiceCommandSpec;

/// Initialize the gesture WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u64(t: f64) -> u64 {
    t.max(0.0) as u64
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn call_json<T: serde::Serialize>(callback: &Function, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize event for JS: {e}");
            return;
        }
    };
    if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
        tracing::warn!("JS callback threw: {e:?}");
    }
}

/// `Date.now()` clock.
#[derive(Debug, Clone, Copy, Default)]
struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        to_u64(js_sys::Date::now())
    }
}

/// Synthesizer backed by a host function taking the utterance as JSON.
struct JsSynthesizer {
    speak: Function,
    cancel: Option<Function>,
}

impl SpeechSynthesizer for JsSynthesizer {
    fn speak(&mut self, utterance: &Utterance) {
        call_json(&self.speak, utterance);
    }

    fn cancel(&mut self) {
        if let Some(cancel) = &self.cancel {
            if let Err(e) = cancel.call0(&JsValue::NULL) {
                tracing::warn!("JS speech cancel threw: {e:?}");
            }
        }
    }
}

/// Recognizer backed by host start/stop functions. `start` receives the
/// voice configuration as JSON.
struct JsRecognizer {
    start: Function,
    stop: Function,
}

impl SpeechRecognizer for JsRecognizer {
    fn start(&mut self, config: &VoiceConfig) -> GestureResult<()> {
        let json = serde_json::to_string(config)?;
        self.start
            .call1(&JsValue::NULL, &JsValue::from_str(&json))
            .map(|_| ())
            .map_err(|e| GestureError::Speech(format!("{e:?}")))
    }

    fn stop(&mut self) {
        if let Err(e) = self.stop.call0(&JsValue::NULL) {
            tracing::warn!("JS recognizer stop threw: {e:?}");
        }
    }
}

/// Gesture and voice engine instance for WASM.
#[wasm_bindgen]
pub struct WasmGestureEngine {
    recognizer: Recognizer,
}

#[wasm_bindgen]
impl WasmGestureEngine {
    /// Create an engine, optionally from a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is malformed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmGestureEngine, JsValue> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(to_js)?,
            None => EngineConfig::default(),
        };
        Ok(Self {
            recognizer: Recognizer::with_clock(config, JsClock),
        })
    }

    /// Subscribe to recognized gestures. The callback receives event JSON.
    #[wasm_bindgen(js_name = onGesture)]
    pub fn on_gesture(&mut self, callback: Function) {
        self.recognizer
            .gestures_mut()
            .subscribe(move |event| call_json(&callback, event));
    }

    /// Subscribe to matched voice commands. The callback receives event JSON.
    #[wasm_bindgen(js_name = onCommand)]
    pub fn on_command(&mut self, callback: Function) {
        self.recognizer
            .voice_mut()
            .subscribe(move |event| call_json(&callback, event));
    }

    /// Register a gesture rule from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON is malformed.
    #[wasm_bindgen(js_name = addRule)]
    pub fn add_rule(&mut self, json: &str) -> Result<(), JsValue> {
        let spec: RuleSpec = serde_json::from_str(json).map_err(to_js)?;
        self.recognizer.gestures_mut().register_spec(&spec);
        Ok(())
    }

    /// Register a voice command from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON or the pattern is invalid.
    #[wasm_bindgen(js_name = addCommand)]
    pub fn add_command(&mut self, json: &str) -> Result<(), JsValue> {
        let spec: VoiceCommandSpec = serde_json::from_str(json).map_err(to_js)?;
        self.recognizer
            .voice_mut()
            .register_spec(&spec)
            .map_err(to_js)?;
        Ok(())
    }

    /// Remove a gesture rule.
    #[wasm_bindgen(js_name = removeRule)]
    pub fn remove_rule(&mut self, name: &str) -> bool {
        self.recognizer.gestures_mut().remove(name)
    }

    /// Enable a gesture rule.
    #[wasm_bindgen(js_name = enableRule)]
    pub fn enable_rule(&mut self, name: &str) -> bool {
        self.recognizer.enable(name)
    }

    /// Disable a gesture rule.
    #[wasm_bindgen(js_name = disableRule)]
    pub fn disable_rule(&mut self, name: &str) -> bool {
        self.recognizer.disable(name)
    }

    /// Registered rule names as a JSON array.
    #[wasm_bindgen(js_name = ruleNames)]
    #[must_use]
    pub fn rule_names(&self) -> String {
        serde_json::to_string(&self.recognizer.gestures().rule_names()).unwrap_or_default()
    }

    /// Pointer down.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64, timestamp: f64) {
        self.recognizer
            .gestures_mut()
            .begin_stroke(Sample::new(x, y, to_u64(timestamp)));
    }

    /// Pointer move.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64, timestamp: f64) {
        self.recognizer
            .gestures_mut()
            .append_sample(Sample::new(x, y, to_u64(timestamp)));
    }

    /// Pointer up. Returns the dispatched events as a JSON array.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64, timestamp: f64) -> String {
        let gestures = self.recognizer.gestures_mut();
        gestures.append_sample(Sample::new(x, y, to_u64(timestamp)));
        let events = gestures.end_stroke();
        serde_json::to_string(&events).unwrap_or_default()
    }

    /// Discard the stroke in progress.
    #[wasm_bindgen(js_name = cancelStroke)]
    pub fn cancel_stroke(&mut self) {
        self.recognizer.gestures_mut().cancel_stroke();
    }

    /// Feed any input event as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON is not a valid input event.
    #[wasm_bindgen(js_name = processEvent)]
    pub fn process_event(&mut self, json: &str) -> Result<(), JsValue> {
        let event: InputEvent = serde_json::from_str(json).map_err(to_js)?;
        self.recognizer.process(&event);
        Ok(())
    }

    /// Feed a recognizer result. Returns matched commands as a JSON array.
    #[wasm_bindgen(js_name = handleTranscript)]
    pub fn handle_transcript(&mut self, transcript: String, confidence: f32, is_final: bool) -> String {
        let event = VoiceEvent::new(transcript, confidence, is_final, to_u64(js_sys::Date::now()));
        let fired = self.recognizer.voice_mut().handle_transcript(&event);
        serde_json::to_string(&fired).unwrap_or_default()
    }

    /// Install the speech synthesizer.
    #[wasm_bindgen(js_name = setSynthesizer)]
    pub fn set_synthesizer(&mut self, speak: Function, cancel: Option<Function>) {
        self.recognizer
            .voice_mut()
            .set_synthesizer(Box::new(JsSynthesizer { speak, cancel }));
    }

    /// Install the speech recognizer.
    #[wasm_bindgen(js_name = setRecognizer)]
    pub fn set_recognizer(&mut self, start: Function, stop: Function) {
        self.recognizer
            .voice_mut()
            .set_recognizer(Box::new(JsRecognizer { start, stop }));
    }

    /// Start listening for voice commands.
    #[wasm_bindgen(js_name = startListening)]
    pub fn start_listening(&mut self) -> bool {
        self.recognizer.voice_mut().start_listening()
    }

    /// Stop listening for voice commands.
    #[wasm_bindgen(js_name = stopListening)]
    pub fn stop_listening(&mut self) {
        self.recognizer.voice_mut().stop_listening();
    }

    /// The host finished speaking an utterance.
    #[wasm_bindgen(js_name = utteranceFinished)]
    pub fn utterance_finished(&mut self, id: f64) {
        self.recognizer
            .voice_mut()
            .utterance_finished(UtteranceId(to_u64(id)));
    }
}
