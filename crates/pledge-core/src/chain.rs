//! Chaining continuations onto promises.
//!
//! Everything here is built on two combinators:
//!
//! - [`Promise::chain`] maps the value with a plain function;
//! - [`Promise::chain_flat`] maps the value to another promise and waits on it.
//!
//! Both take a rejection *observer*: it sees the error, but the error still
//! propagates to the returned promise. Only [`Promise::recover`] turns a
//! rejection back into a value. A chain with no observer anywhere drops its
//! error silently (a `debug` event is the only trace).

use std::cell::Cell;
use std::rc::Rc;

use crate::cell::Promise;

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Value-mapping chain.
    ///
    /// Returns a new promise fulfilled with `on_fulfilled(value)`, or rejected
    /// with the same error after `on_rejected` has observed it. If `self` is
    /// already settled the continuation runs before `chain` returns.
    pub fn chain<R, F, O>(&self, on_fulfilled: F, on_rejected: O) -> Promise<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        O: FnOnce(&E) + 'static,
    {
        match self.outcome() {
            None => {
                let (target, resolver) = Promise::<R, E>::pending();
                let on_error = resolver.clone();
                self.enqueue(
                    Box::new(move |value| resolver.resolve(on_fulfilled(value))),
                    Box::new(move |error| {
                        on_rejected(&error);
                        on_error.reject(error);
                    }),
                );
                target
            }
            Some(Ok(value)) => Promise::fulfilled(on_fulfilled(value)),
            Some(Err(error)) => {
                on_rejected(&error);
                Promise::rejected(error)
            }
        }
    }

    /// Flattening chain (monadic bind).
    ///
    /// `on_fulfilled` returns another promise; the returned promise settles
    /// with that inner promise's outcome rather than wrapping it.
    pub fn chain_flat<R, F, O>(&self, on_fulfilled: F, on_rejected: O) -> Promise<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> Promise<R, E> + 'static,
        O: FnOnce(&E) + 'static,
    {
        match self.outcome() {
            None => {
                let (target, resolver) = Promise::<R, E>::pending();
                let on_error = resolver.clone();
                self.enqueue(
                    Box::new(move |value| {
                        // Forward straight into `target`; an intermediate
                        // promise here would be an unobserved rejection.
                        let on_inner_error = resolver.clone();
                        on_fulfilled(value).enqueue(
                            Box::new(move |inner| resolver.resolve(inner)),
                            Box::new(move |error| on_inner_error.reject(error)),
                        );
                    }),
                    Box::new(move |error| {
                        on_rejected(&error);
                        on_error.reject(error);
                    }),
                );
                target
            }
            Some(Ok(value)) => on_fulfilled(value).chain(|inner| inner, |_| {}),
            Some(Err(error)) => {
                on_rejected(&error);
                Promise::rejected(error)
            }
        }
    }

    /// Transform the value; rejections pass through untouched.
    pub fn map<R, F>(&self, on_fulfilled: F) -> Promise<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
    {
        self.chain(on_fulfilled, |_| {})
    }

    /// Alias for [`map`](Self::map).
    pub fn then<R, F>(&self, on_fulfilled: F) -> Promise<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
    {
        self.map(on_fulfilled)
    }

    /// Continue with further asynchronous work.
    pub fn flat_map<R, F>(&self, on_fulfilled: F) -> Promise<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> Promise<R, E> + 'static,
    {
        self.chain_flat(on_fulfilled, |_| {})
    }

    /// Observe a rejection.
    ///
    /// The returned promise is fulfilled with `()` on success and still
    /// rejected on failure; use [`recover`](Self::recover) to stop
    /// propagation.
    pub fn catch_error<O>(&self, on_error: O) -> Promise<(), E>
    where
        O: FnOnce(&E) + 'static,
    {
        self.chain(|_| (), on_error)
    }

    /// Run `on_completed` once the promise settles either way.
    ///
    /// The returned promise mirrors this one's outcome.
    pub fn finally<F>(&self, on_completed: F) -> Promise<T, E>
    where
        F: FnOnce() + 'static,
    {
        // Exactly one of the two branches ever runs.
        let on_value = Rc::new(Cell::new(Some(on_completed)));
        let on_error = Rc::clone(&on_value);

        self.chain(
            move |value| {
                if let Some(f) = on_value.take() {
                    f();
                }
                value
            },
            move |_| {
                if let Some(f) = on_error.take() {
                    f();
                }
            },
        )
    }

    /// Observe the value at the end of a chain.
    pub fn tap<F>(&self, on_next: F) -> Promise<(), E>
    where
        F: FnOnce(T) + 'static,
    {
        self.map(on_next)
    }

    /// Alias for [`tap`](Self::tap).
    pub fn done<F>(&self, on_next: F) -> Promise<(), E>
    where
        F: FnOnce(T) + 'static,
    {
        self.tap(on_next)
    }

    /// Handle a rejection by producing a replacement value.
    ///
    /// Unlike the observers taken by the chain combinators, this stops the
    /// error: the returned promise is always fulfilled.
    pub fn recover<F>(&self, on_error: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> T + 'static,
    {
        let source = self.clone();
        Promise::new(move |resolver| {
            let on_value = resolver.clone();
            source.enqueue(
                Box::new(move |value| on_value.resolve(value)),
                Box::new(move |error| resolver.resolve(on_error(error))),
            );
        })
    }
}

/// Start a chain.
///
/// Only calls `producer`; it exists so the first step of a chain reads like
/// the rest.
pub fn firstly<T, E, F>(producer: F) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce() -> Promise<T, E>,
{
    producer()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::PledgeError;
    use crate::testing::unobserved_rejections;
    use crate::types::PromiseState;

    type TestPromise = Promise<i32, PledgeError>;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        (count.clone(), count)
    }

    #[test]
    fn test_map_on_fulfilled_is_immediate() {
        let doubled = TestPromise::fulfilled(5).map(|x| x * 2);

        assert_eq!(doubled.state(), PromiseState::Fulfilled);
        assert_eq!(doubled.value(), Some(10));
    }

    #[test]
    fn test_map_on_pending_waits_for_settlement() {
        let (source, resolver) = TestPromise::pending();
        let doubled = source.map(|x| x * 2);

        assert!(doubled.is_pending());
        resolver.resolve(21);
        assert_eq!(doubled.value(), Some(42));
    }

    #[test]
    fn test_rejection_propagates_through_map() {
        let (calls, seen) = counter();
        let error = PledgeError::rejected("E");

        let mapped = TestPromise::rejected(error.clone()).chain(
            |x| x + 1,
            move |_| calls.set(calls.get() + 1),
        );

        assert_eq!(mapped.error(), Some(error));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_pending_rejection_observer_runs_once_then_propagates() {
        let (source, resolver) = TestPromise::pending();
        let (calls, seen) = counter();

        let mapped = source.chain(|x| x.to_string(), move |_| calls.set(calls.get() + 1));
        resolver.reject(PledgeError::rejected("late"));
        resolver.reject(PledgeError::rejected("later"));

        assert_eq!(seen.get(), 1);
        assert_eq!(mapped.error(), Some(PledgeError::rejected("late")));
    }

    #[test]
    fn test_rejection_skips_downstream_maps() {
        let (calls, seen) = counter();
        let (source, resolver) = TestPromise::pending();

        let end = source
            .map(|x| x + 1)
            .map(move |x| {
                calls.set(calls.get() + 1);
                x * 10
            })
            .map(|x| format!("{x}"));
        resolver.reject(PledgeError::Timeout { duration_ms: 3 });

        assert_eq!(seen.get(), 0);
        assert_eq!(end.error(), Some(PledgeError::Timeout { duration_ms: 3 }));
    }

    #[test]
    fn test_flat_map_flattens_settled_inner() {
        let flattened = TestPromise::fulfilled(1).flat_map(|x| TestPromise::fulfilled(x + 1));

        assert_eq!(flattened.value(), Some(2));
    }

    #[test]
    fn test_flat_map_waits_on_pending_inner() {
        let (source, outer) = TestPromise::pending();
        let (inner, inner_resolver) = TestPromise::pending();
        let handed_out = inner.clone();

        let flattened = source.flat_map(move |_| handed_out);

        outer.resolve(1);
        assert!(flattened.is_pending());

        inner_resolver.resolve(2);
        assert_eq!(flattened.value(), Some(2));
    }

    #[test]
    fn test_flat_map_forwards_inner_rejection() {
        let (source, resolver) = TestPromise::pending();

        let flattened: Promise<String, PledgeError> =
            source.flat_map(|_| Promise::rejected(PledgeError::rejected("inner")));
        resolver.resolve(1);

        assert_eq!(flattened.error(), Some(PledgeError::rejected("inner")));
    }

    #[test]
    fn test_flat_map_on_rejected_source() {
        let (calls, seen) = counter();

        let flattened = TestPromise::rejected(PledgeError::ProducerDropped).chain_flat(
            |x| TestPromise::fulfilled(x),
            move |_| calls.set(calls.get() + 1),
        );

        assert_eq!(seen.get(), 1);
        assert_eq!(flattened.error(), Some(PledgeError::ProducerDropped));
    }

    #[test]
    fn test_end_to_end_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();

        let end = firstly(|| TestPromise::fulfilled(1))
            .map(|v| v * 2)
            .map(|v| format!("n={v}"))
            .tap(move |s| sink.borrow_mut().push(s));

        assert!(end.is_fulfilled());
        assert_eq!(*log.borrow(), vec!["n=2".to_string()]);
    }

    #[test]
    fn test_done_is_tap() {
        let (calls, seen) = counter();
        let (source, resolver) = TestPromise::pending();

        source.then(|v| v + 1).done(move |v| {
            assert_eq!(v, 4);
            calls.set(calls.get() + 1);
        });
        resolver.resolve(3);

        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_finally_on_fulfilled() {
        let (calls, seen) = counter();

        let after = TestPromise::fulfilled(8).finally(move || calls.set(calls.get() + 1));

        assert_eq!(seen.get(), 1);
        assert_eq!(after.value(), Some(8));
    }

    #[test]
    fn test_finally_on_rejected() {
        let (calls, seen) = counter();
        let (source, resolver) = TestPromise::pending();

        let after = source.finally(move || calls.set(calls.get() + 1));
        resolver.reject(PledgeError::rejected("nope"));

        assert_eq!(seen.get(), 1);
        assert_eq!(after.error(), Some(PledgeError::rejected("nope")));
    }

    #[test]
    fn test_catch_error_observes_but_does_not_swallow() {
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();

        let caught = TestPromise::rejected(PledgeError::rejected("bad"))
            .map(|x| x + 1)
            .catch_error(move |e| *sink.borrow_mut() = Some(e.clone()));

        assert_eq!(*seen.borrow(), Some(PledgeError::rejected("bad")));
        assert!(caught.is_rejected());
    }

    #[test]
    fn test_catch_error_on_success_yields_unit() {
        let (calls, seen) = counter();

        let caught = TestPromise::fulfilled(1).catch_error(move |_| calls.set(calls.get() + 1));

        assert_eq!(caught.value(), Some(()));
        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn test_recover_stops_propagation() {
        let (source, resolver) = TestPromise::pending();

        let recovered = source.recover(|_| -1).map(|x| x * 2);
        resolver.reject(PledgeError::rejected("gone"));

        assert_eq!(recovered.value(), Some(-2));
    }

    #[test]
    fn test_recover_passes_values_through() {
        let recovered = TestPromise::fulfilled(3).recover(|_| 0);

        assert_eq!(recovered.value(), Some(3));
    }

    #[test]
    fn test_chaining_during_drain_runs_immediately() {
        let (source, resolver) = TestPromise::pending();
        let log = Rc::new(RefCell::new(Vec::new()));

        let reentrant = source.clone();
        let outer_log = log.clone();
        source.tap(move |v| {
            outer_log.borrow_mut().push(format!("first {v}"));
            let inner_log = outer_log.clone();
            reentrant.tap(move |v| inner_log.borrow_mut().push(format!("nested {v}")));
        });
        let last_log = log.clone();
        source.tap(move |v| last_log.borrow_mut().push(format!("second {v}")));

        resolver.resolve(1);

        assert_eq!(*log.borrow(), vec!["first 1", "nested 1", "second 1"]);
    }

    #[test]
    fn test_branches_fire_in_registration_order() {
        let (source, resolver) = TestPromise::pending();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["A", "B", "C"] {
            let log = log.clone();
            source.tap(move |_| log.borrow_mut().push(name));
        }
        resolver.resolve(0);

        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_chain_releases_captures_after_settlement() {
        let (source, resolver) = TestPromise::pending();
        let guard = Rc::new(());
        let weak = Rc::downgrade(&guard);

        let observed = source.catch_error(move |_| drop(guard));
        resolver.resolve(1);

        assert!(weak.upgrade().is_none());
        assert!(observed.is_fulfilled());
    }

    #[test]
    fn test_flat_map_forwarding_adds_no_unobserved_rejection() {
        let (source, outer) = TestPromise::pending();
        let (inner, inner_resolver) = TestPromise::pending();
        let handed_out = inner.clone();

        let flattened = source.flat_map(move |_| handed_out);
        let caught = flattened.catch_error(|_| {});

        let ids = unobserved_rejections(|| {
            outer.resolve(1);
            inner_resolver.reject(PledgeError::rejected("inner"));
        });

        // Only the terminal promise returned by catch_error goes unobserved.
        assert_eq!(ids, vec![caught.id().to_string()]);
        assert_eq!(flattened.error(), Some(PledgeError::rejected("inner")));
    }
}
