//! Input events consumed by the engine.

use serde::{Deserialize, Serialize};

/// A single timestamped pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// X position in surface coordinates.
    pub x: f64,
    /// Y position in surface coordinates.
    pub y: f64,
    /// Timestamp in milliseconds (host clock, best effort).
    pub timestamp_ms: u64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub const fn new(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }

    /// Euclidean distance to another sample.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Phase of a touch or pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection or lost pointer capture).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in surface coordinates.
    pub x: f32,
    /// Y position in surface coordinates.
    pub y: f32,
}

impl TouchPoint {
    /// Convert to a sample at the given time.
    #[must_use]
    pub fn to_sample(&self, timestamp_ms: u64) -> Sample {
        Sample::new(f64::from(self.x), f64::from(self.y), timestamp_ms)
    }
}

/// A touch event carrying the touch points that changed.
///
/// For `Start` and `Move`, `touches` lists the points that went down or moved.
/// For `End` and `Cancel`, it lists the points that lifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// Changed touch points.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Create a single-finger event.
    #[must_use]
    pub fn single(phase: TouchPhase, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(phase, vec![TouchPoint { id: 0, x, y }], timestamp_ms)
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }
}

/// A voice input event from speech recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceEvent {
    /// The recognized speech transcript.
    pub transcript: String,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
    /// Whether this is a final (committed) result.
    ///
    /// Interim results may change as speech recognition continues and are
    /// never matched against voice commands.
    pub is_final: bool,
    /// Timestamp when the speech was recognized.
    pub timestamp_ms: u64,
}

impl VoiceEvent {
    /// Create a new voice event.
    #[must_use]
    pub fn new(transcript: String, confidence: f32, is_final: bool, timestamp_ms: u64) -> Self {
        Self {
            transcript,
            confidence,
            is_final,
            timestamp_ms,
        }
    }

    /// Create an interim (non-final) voice event.
    #[must_use]
    pub fn interim(transcript: String, confidence: f32, timestamp_ms: u64) -> Self {
        Self::new(transcript, confidence, false, timestamp_ms)
    }

    /// Create a final voice event.
    #[must_use]
    pub fn final_result(transcript: String, confidence: f32, timestamp_ms: u64) -> Self {
        Self::new(transcript, confidence, true, timestamp_ms)
    }
}

/// All input events the engine can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Touch event (one or two fingers).
    Touch(TouchEvent),

    /// Pointer (mouse or pen) event.
    Pointer {
        /// Phase of the pointer interaction.
        phase: TouchPhase,
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
        /// Timestamp in milliseconds.
        timestamp_ms: u64,
    },

    /// Voice input from speech recognition.
    Voice(VoiceEvent),

    /// A queued utterance finished playing.
    UtteranceEnd {
        /// Identifier of the utterance that completed.
        id: u64,
    },
}

impl InputEvent {
    /// Timestamp carried by the event, if any.
    #[must_use]
    pub fn timestamp_ms(&self) -> Option<u64> {
        match self {
            Self::Touch(touch) => Some(touch.timestamp_ms),
            Self::Pointer { timestamp_ms, .. } => Some(*timestamp_ms),
            Self::Voice(voice) => Some(voice.timestamp_ms),
            Self::UtteranceEnd { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_distance() {
        let a = Sample::new(0.0, 0.0, 0);
        let b = Sample::new(3.0, 4.0, 10);
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_touch_event_helpers() {
        let event = TouchEvent::single(TouchPhase::Start, 10.0, 20.0, 5);
        assert!(!event.is_multi_touch());
        let primary = event.primary_touch().unwrap();
        assert_eq!(primary.id, 0);
        let sample = primary.to_sample(event.timestamp_ms);
        assert!((sample.x - 10.0).abs() < f64::EPSILON);
        assert_eq!(sample.timestamp_ms, 5);
    }

    #[test]
    fn test_input_event_json_shape() {
        let event = InputEvent::Voice(VoiceEvent::final_result("save".to_string(), 0.9, 42));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Voice\""));
        assert!(json.contains("\"isFinal\":true"));

        let parsed: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.timestamp_ms(), Some(42));
    }

    #[test]
    fn test_pointer_event_from_json() {
        let json = r#"{"type":"Pointer","data":{"phase":"move","x":1.5,"y":2.0,"timestamp_ms":7}}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        match event {
            InputEvent::Pointer { phase, timestamp_ms, .. } => {
                assert_eq!(phase, TouchPhase::Move);
                assert_eq!(timestamp_ms, 7);
            }
            _ => panic!("Expected Pointer event"),
        }
    }
}
