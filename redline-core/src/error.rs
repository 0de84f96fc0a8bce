//! Error types for redline-core.

use thiserror::Error;

/// Result type alias for redline-core operations.
pub type Result<T> = std::result::Result<T, RedlineError>;

/// Errors that can occur while parsing, comparing or serializing documents.
#[derive(Error, Debug)]
pub enum RedlineError {
    /// Malformed or unsupported input document.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what could not be parsed.
        message: String,
    },

    /// A construct the atomizer cannot classify. Handled inside the engine by
    /// degrading the construct to an opaque atom.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Name of the unsupported construct.
        feature: String,
    },

    /// Detail threshold outside `[0, 1]`.
    #[error("Detail threshold must be within [0, 1], got {value}")]
    ThresholdConfig {
        /// The rejected threshold.
        value: f64,
    },

    /// Any other rejected comparison setting.
    #[error("Invalid setting '{name}': {message}")]
    InvalidSetting {
        /// Setting name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// Documents of different kinds, or a kind other than the one requested.
    #[error("Document kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind that was expected.
        expected: String,
        /// Kind that was found.
        found: String,
    },

    /// The engine produced an inconsistent result. Always a bug; never retried.
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// Which invariant failed.
        message: String,
    },

    /// IO error reading or writing documents.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RedlineError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        RedlineError::InvariantViolation {
            message: message.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        RedlineError::Parse {
            message: message.into(),
        }
    }
}
