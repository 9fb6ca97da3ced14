//! # Pledge Runtime
//!
//! A single-threaded cooperative event loop with a virtual clock, and
//! producers that settle promises from timers running on it.

pub mod config;
pub mod event_loop;
pub mod timers;

pub use config::LoopConfig;
pub use event_loop::{EventLoop, RunStats};
pub use timers::{after, fail_after, timeout};
