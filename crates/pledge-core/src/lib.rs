//! # Pledge Core
//!
//! Single-threaded promises with composable chaining.
//!
//! This crate provides:
//! - [`Promise`] - a settle-once deferred value with ordered callback queues
//! - [`Resolver`] - the producer handle that settles a promise
//! - [`PromiseState`] - the observable lifecycle tag
//! - [`PledgeError`] - a general-purpose rejection and error type
//!
//! ```
//! use pledge_core::prelude::*;
//!
//! let (source, resolver) = Promise::<i32, PledgeError>::pending();
//! let shown = firstly(|| source.clone())
//!     .map(|v| v * 2)
//!     .map(|v| format!("n={v}"));
//!
//! resolver.resolve(1);
//! assert_eq!(shown.value().as_deref(), Some("n=2"));
//! ```

pub mod cell;
pub mod chain;
pub mod error;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use cell::{Promise, Resolver};
pub use chain::firstly;
pub use error::{PledgeError, Result};
pub use types::PromiseState;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::cell::{Promise, Resolver};
    pub use crate::chain::firstly;
    pub use crate::error::{PledgeError, Result};
    pub use crate::types::PromiseState;
}
