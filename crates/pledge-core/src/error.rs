//! Error types for Pledge.
//!
//! Promises are generic over their rejection type; [`PledgeError`] is the
//! ready-made choice for producers without a domain error of their own, and
//! the error type for the fallible operations around the core.

use thiserror::Error;

/// Main error type for Pledge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PledgeError {
    /// A producer rejected its promise.
    #[error("Promise rejected: {reason}")]
    Rejected { reason: String },

    /// A timed producer gave up.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The producer went away without settling.
    #[error("Producer dropped before settling")]
    ProducerDropped,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The event loop ran more tasks than its budget allows.
    #[error("Event loop exhausted its budget of {max_tasks} tasks")]
    LoopExhausted { max_tasks: usize },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PledgeError {
    /// Shorthand for a [`PledgeError::Rejected`] with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        PledgeError::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the producer could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PledgeError::Timeout { .. } | PledgeError::ProducerDropped
        )
    }
}

/// Convenience Result type for Pledge operations.
pub type Result<T> = std::result::Result<T, PledgeError>;

impl From<serde_json::Error> for PledgeError {
    fn from(err: serde_json::Error) -> Self {
        PledgeError::Serialization(err.to_string())
    }
}
