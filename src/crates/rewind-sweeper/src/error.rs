//! Error types for sweep cycles

use thiserror::Error;

/// Result type for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Errors that can occur during a durability sweep
///
/// A failed step aborts the current cycle only; the last-known-good marker
/// is untouched and the cycle is retried at the next scheduled interval.
/// Sweep errors are never escalated to request-path callers.
#[derive(Error, Debug)]
pub enum SweepError {
    /// One dump step failed or timed out
    #[error("sweep step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// I/O error while preparing the output location or marker
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact encoding error
    #[error("artifact encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

impl SweepError {
    /// A step failure with the given step label and reason
    pub fn step(step: impl Into<String>, reason: impl ToString) -> Self {
        Self::StepFailed {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}
