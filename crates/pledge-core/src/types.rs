//! Common types shared by promises and their observers.

use serde::{Deserialize, Serialize};

/// Observable lifecycle state of a promise.
///
/// A promise leaves `Pending` at most once and never changes state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    /// Not settled yet; callbacks are queued.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with an error.
    Rejected,
}

impl PromiseState {
    /// Returns true if this is a terminal state.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PromiseState::Pending)
    }
}
