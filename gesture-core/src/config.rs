//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GestureResult;
use crate::rule::RuleSpec;
use crate::voice::VoiceCommandSpec;

/// Stroke capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum samples kept per stroke (oldest dropped first).
    pub max_stroke_points: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_stroke_points: 100,
        }
    }
}

/// Arbitration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// A passing rule with a priority strictly above this value stops
    /// evaluation of lower-ranked rules for the same stroke.
    pub short_circuit_priority: i32,
    /// How long a finished stroke stays available as the first tap of a
    /// double tap.
    pub tap_history_ms: u64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            short_circuit_priority: 5,
            tap_history_ms: 600,
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Recognition locale (BCP 47).
    pub lang: String,
    /// Keep listening after each final result.
    pub continuous: bool,
    /// Ask the recognizer for interim results.
    pub interim_results: bool,
    /// Minimum confidence for a final transcript to be matched.
    pub min_confidence: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            lang: "pl-PL".to_string(),
            continuous: true,
            interim_results: true,
            min_confidence: 0.0,
        }
    }
}

/// Multi-modal fusion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Window within which voice and gesture count as coincident for
    /// interactions that require it.
    pub window_ms: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { window_ms: 2000 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stroke capture settings.
    pub capture: CaptureConfig,
    /// Arbitration settings.
    pub arbitration: ArbitrationConfig,
    /// Speech recognition settings.
    pub voice: VoiceConfig,
    /// Multi-modal fusion settings.
    pub fusion: FusionConfig,
    /// Gesture rules registered at startup.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
    /// Voice commands registered at startup.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<VoiceCommandSpec>,
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::Config`](crate::GestureError::Config) if the
    /// JSON is malformed.
    pub fn from_json(json: &str) -> GestureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it is not valid JSON.
    pub fn from_path(path: impl AsRef<Path>) -> GestureResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
