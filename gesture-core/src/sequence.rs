//! # Sequence Composer
//!
//! Chains detectors across successive strokes. Progress is tracked per
//! sequence rule:
//!
//! ```text
//! step 0 ──match──► step 1 ──match──► ... ──match last──► complete (back to 0)
//!    ▲                 │                        │
//!    └──── miss / inter-step timeout ───────────┘
//! ```
//!
//! A stroke that misses the expected step resets progress and is tested
//! once more against the first step, so `circle, circle, swipe` still
//! completes `[circle, swipe]`.

use crate::detector::{DetectionResult, Detector, DetectorInput, Metrics};

/// Default time allowed between two steps.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 1000;

/// Progress through an ordered chain of detectors.
#[derive(Debug, Clone)]
pub struct SequenceRule {
    steps: Vec<Detector>,
    timeout_ms: u64,
    current_step: usize,
    last_progress_ms: Option<u64>,
}

impl SequenceRule {
    /// Create a sequence over the given steps.
    ///
    /// An empty sequence never completes.
    #[must_use]
    pub fn new(steps: Vec<Detector>, timeout_ms: u64) -> Self {
        if steps.is_empty() {
            tracing::warn!("Sequence rule registered without steps; it will never complete");
        }
        Self {
            steps,
            timeout_ms,
            current_step: 0,
            last_progress_ms: None,
        }
    }

    /// The ordered steps.
    #[must_use]
    pub fn steps(&self) -> &[Detector] {
        &self.steps
    }

    /// Index of the step the next stroke must match.
    #[must_use]
    pub const fn current_step(&self) -> usize {
        self.current_step
    }

    /// Time allowed between two steps.
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Change the time allowed between two steps.
    pub fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    /// Drop any progress.
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.last_progress_ms = None;
    }

    fn matches_current(&self, input: &DetectorInput<'_>) -> bool {
        self.steps
            .get(self.current_step)
            .is_some_and(|step| step.detect(input).detected)
    }

    /// Feed one evaluated stroke.
    ///
    /// Returns a detection when this stroke completed the chain.
    pub fn advance(&mut self, input: &DetectorInput<'_>, now_ms: u64) -> Option<DetectionResult> {
        if self.steps.is_empty() {
            return None;
        }

        let expired = self
            .last_progress_ms
            .is_some_and(|t| now_ms.saturating_sub(t) > self.timeout_ms);
        if self.current_step > 0 && expired {
            tracing::debug!(
                "Sequence timed out at step {}/{}",
                self.current_step,
                self.steps.len()
            );
            self.reset();
        }

        if !self.matches_current(input) {
            if self.current_step == 0 {
                return None;
            }
            self.reset();
            if !self.matches_current(input) {
                return None;
            }
        }

        self.current_step += 1;
        self.last_progress_ms = Some(now_ms);
        if self.current_step < self.steps.len() {
            return None;
        }

        let steps = self.steps.len();
        self.reset();
        Some(DetectionResult::hit(1.0, Metrics::Sequence { steps }))
    }
}
