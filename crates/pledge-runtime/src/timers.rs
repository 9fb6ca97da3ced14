//! Timer-driven producers.

use pledge_core::{PledgeError, Promise};

use crate::event_loop::EventLoop;

/// A promise fulfilled with `value` once `delay_ms` of loop time has passed.
pub fn after<T, E>(event_loop: &EventLoop, delay_ms: u64, value: T) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Promise::new(|resolver| {
        event_loop.schedule(delay_ms, move || resolver.resolve(value));
    })
}

/// A promise rejected with `error` once `delay_ms` of loop time has passed.
pub fn fail_after<T, E>(event_loop: &EventLoop, delay_ms: u64, error: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Promise::new(|resolver| {
        event_loop.schedule(delay_ms, move || resolver.reject(error));
    })
}

/// A promise rejected with [`PledgeError::Timeout`] after `delay_ms`.
pub fn timeout<T>(event_loop: &EventLoop, delay_ms: u64) -> Promise<T, PledgeError>
where
    T: Clone + 'static,
{
    fail_after(
        event_loop,
        delay_ms,
        PledgeError::Timeout {
            duration_ms: delay_ms,
        },
    )
}
