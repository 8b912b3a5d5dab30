//! The failure taxonomy for clustering runs.

use thiserror::Error;

/// Errors produced while validating or running a clustering run.
///
/// Every failure is detected before or during the run and surfaced to the
/// caller; an invalid option never degrades into a default.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaletteError {
    /// The pixel source handed over no pixels.
    ///
    /// The decoding boundary reports its own failures (unreadable file,
    /// unsupported format) by producing no pixels, so they all surface here.
    #[error("no pixels were supplied")]
    EmptyInput,

    /// The configuration as a whole was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which option (or combination of options) was out of range.
        reason: String,
    },

    /// The refinement loop hit its iteration cap before the maximum center
    /// drift fell below the similarity threshold.
    #[error("no convergence after {iterations} iterations (last max drift {max_drift})")]
    ConvergenceTimeout {
        /// The configured iteration cap.
        iterations: u32,
        /// The maximum center drift measured in the final iteration.
        max_drift: f32,
    },
}

impl PaletteError {
    /// Create an [`InvalidConfiguration`](Self::InvalidConfiguration) error with context.
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }
}
