//! The deferred cell behind every [`Promise`].
//!
//! A cell is either pending, with two ordered callback queues, or settled
//! with exactly one of a value or an error. Settling moves the queues out of
//! the cell before running them, so a settled cell never holds callbacks and
//! nothing they captured outlives settlement.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::PledgeError;
use crate::types::PromiseState;

pub(crate) type FulfillCallback<T> = Box<dyn FnOnce(T)>;
pub(crate) type RejectCallback<E> = Box<dyn FnOnce(E)>;

enum Slot<T, E> {
    Pending {
        on_fulfilled: Vec<FulfillCallback<T>>,
        on_rejected: Vec<RejectCallback<E>>,
    },
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Slot<T, E> {
    fn pending() -> Self {
        Slot::Pending {
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
        }
    }

    fn state(&self) -> PromiseState {
        match self {
            Slot::Pending { .. } => PromiseState::Pending,
            Slot::Fulfilled(_) => PromiseState::Fulfilled,
            Slot::Rejected(_) => PromiseState::Rejected,
        }
    }
}

struct Shared<T, E> {
    id: Uuid,
    slot: Slot<T, E>,
}

/// A value that will be available later, or an error explaining why not.
///
/// `Promise` is a cheap handle: clones observe the same cell. Values and
/// errors are handed to every continuation by clone, hence the `Clone`
/// bounds. Promises are single-threaded (`!Send`); producers running on
/// other threads must hop back onto the owning thread before settling.
pub struct Promise<T, E> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

/// Producer side of a [`Promise`].
///
/// The first call to [`resolve`](Resolver::resolve) or
/// [`reject`](Resolver::reject) settles the promise; later calls are no-ops.
pub struct Resolver<T, E> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Create a promise driven by `setup`.
    ///
    /// `setup` runs synchronously, before `new` returns, and is expected to
    /// eventually settle the promise through the [`Resolver`] it receives,
    /// typically after handing it to some asynchronous work.
    pub fn new<F>(setup: F) -> Self
    where
        F: FnOnce(Resolver<T, E>),
    {
        let (promise, resolver) = Self::pending();
        setup(resolver);
        promise
    }

    /// Create a pending promise together with its resolver.
    pub fn pending() -> (Self, Resolver<T, E>) {
        let shared = Rc::new(RefCell::new(Shared {
            id: Uuid::new_v4(),
            slot: Slot::pending(),
        }));
        let promise = Self {
            shared: Rc::clone(&shared),
        };
        (promise, Resolver { shared })
    }

    /// Create a promise that is already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        Self::settled(Slot::Fulfilled(value))
    }

    /// Create a promise that is already rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self::settled(Slot::Rejected(error))
    }

    fn settled(slot: Slot<T, E>) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                id: Uuid::new_v4(),
                slot,
            })),
        }
    }

    /// Identity of the underlying cell, shared by all clones.
    pub fn id(&self) -> Uuid {
        self.shared.borrow().id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PromiseState {
        self.shared.borrow().slot.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state() == PromiseState::Fulfilled
    }

    pub fn is_rejected(&self) -> bool {
        self.state() == PromiseState::Rejected
    }

    /// The settled value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &self.shared.borrow().slot {
            Slot::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The settled error, if rejected.
    pub fn error(&self) -> Option<E> {
        match &self.shared.borrow().slot {
            Slot::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// The settled outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &self.shared.borrow().slot {
            Slot::Pending { .. } => None,
            Slot::Fulfilled(value) => Some(Ok(value.clone())),
            Slot::Rejected(error) => Some(Err(error.clone())),
        }
    }

    /// Queue one callback per outcome; exactly one of them will run.
    ///
    /// On a settled cell the matching callback runs immediately.
    pub(crate) fn enqueue(
        &self,
        on_fulfilled: FulfillCallback<T>,
        on_rejected: RejectCallback<E>,
    ) {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            match &mut shared.slot {
                Slot::Pending {
                    on_fulfilled: fulfill_queue,
                    on_rejected: reject_queue,
                } => {
                    fulfill_queue.push(on_fulfilled);
                    reject_queue.push(on_rejected);
                    return;
                }
                Slot::Fulfilled(value) => Ok(value.clone()),
                Slot::Rejected(error) => Err(error.clone()),
            }
        };

        match outcome {
            Ok(value) => on_fulfilled(value),
            Err(error) => on_rejected(error),
        }
    }

    /// Bridge into `async` code.
    ///
    /// The receiver completes with the outcome once the promise settles. If
    /// every handle to a pending promise is dropped, the receiver yields a
    /// `RecvError` instead; [`Promise::wait`] turns that into
    /// [`PledgeError::ProducerDropped`].
    pub fn into_receiver(self) -> oneshot::Receiver<Result<T, E>> {
        let (tx, rx) = oneshot::channel();
        let on_value = Rc::new(Cell::new(Some(tx)));
        let on_error = Rc::clone(&on_value);

        self.enqueue(
            Box::new(move |value| {
                if let Some(tx) = on_value.take() {
                    let _ = tx.send(Ok(value));
                }
            }),
            Box::new(move |error| {
                if let Some(tx) = on_error.take() {
                    let _ = tx.send(Err(error));
                }
            }),
        );

        rx
    }
}

impl<T: Clone + 'static> Promise<T, PledgeError> {
    /// Await the outcome from `async` code.
    ///
    /// Fails with [`PledgeError::ProducerDropped`] if every handle to the
    /// promise is dropped while it is still pending.
    pub async fn wait(self) -> crate::Result<T> {
        self.into_receiver()
            .await
            .map_err(|_| PledgeError::ProducerDropped)?
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Resolver<T, E> {
    /// Fulfill the promise with `value`, then run its fulfillment callbacks
    /// in registration order. No-op if already settled.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Reject the promise with `error`, then run its rejection callbacks in
    /// registration order. No-op if already settled.
    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    /// Returns true once the promise has left the pending state.
    pub fn is_settled(&self) -> bool {
        self.shared.borrow().slot.state().is_settled()
    }

    /// A handle to the promise this resolver settles.
    pub fn promise(&self) -> Promise<T, E> {
        Promise {
            shared: Rc::clone(&self.shared),
        }
    }

    fn settle(&self, outcome: Result<T, E>) {
        let (id, queued) = {
            let mut shared = self.shared.borrow_mut();
            if !matches!(shared.slot, Slot::Pending { .. }) {
                tracing::trace!(promise = %shared.id, "Promise already settled, ignoring");
                return;
            }

            let settled = match &outcome {
                Ok(value) => Slot::Fulfilled(value.clone()),
                Err(error) => Slot::Rejected(error.clone()),
            };
            (shared.id, mem::replace(&mut shared.slot, settled))
        };

        // The cell no longer owns the queues; whichever one is not drained
        // below is dropped here along with everything it captured.
        let Slot::Pending {
            on_fulfilled,
            on_rejected,
        } = queued
        else {
            return;
        };

        match outcome {
            Ok(value) => {
                drop(on_rejected);
                tracing::trace!(
                    promise = %id,
                    state = ?PromiseState::Fulfilled,
                    drained = on_fulfilled.len(),
                    "Promise settled"
                );
                for callback in on_fulfilled {
                    callback(value.clone());
                }
            }
            Err(error) => {
                drop(on_fulfilled);
                if on_rejected.is_empty() {
                    tracing::debug!(
                        promise = %id,
                        state = ?PromiseState::Rejected,
                        "Promise rejected with no observer"
                    );
                } else {
                    tracing::trace!(
                        promise = %id,
                        state = ?PromiseState::Rejected,
                        drained = on_rejected.len(),
                        "Promise settled"
                    );
                }
                for callback in on_rejected {
                    callback(error.clone());
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.try_borrow() {
            Ok(shared) => f
                .debug_struct("Promise")
                .field("id", &shared.id)
                .field("state", &shared.slot.state())
                .finish(),
            Err(_) => f.debug_struct("Promise").finish_non_exhaustive(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.try_borrow() {
            Ok(shared) => f
                .debug_struct("Resolver")
                .field("id", &shared.id)
                .field("state", &shared.slot.state())
                .finish(),
            Err(_) => f.debug_struct("Resolver").finish_non_exhaustive(),
        }
    }
}
