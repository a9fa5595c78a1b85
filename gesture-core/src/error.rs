//! Error types for gesture and voice engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type GestureResult<T> = Result<T, GestureError>;

/// Errors that can surface from registration and configuration.
///
/// Recognition itself never fails: detector faults are contained and
/// reported as a non-detection.
#[derive(Debug, Error)]
pub enum GestureError {
    /// A voice command pattern is not a valid regular expression.
    #[error("Invalid voice pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Engine configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No rule is registered under the given name.
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// A speech capability is missing or refused to start.
    #[error("Speech error: {0}")]
    Speech(String),

    /// A detector failed while classifying a stroke.
    #[error("Detector fault: {0}")]
    DetectorFault(String),
}
