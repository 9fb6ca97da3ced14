//! Test helpers shared across modules.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Collects the promise id of every "no observer" event.
#[derive(Clone, Default)]
struct UnobservedRejections(Arc<Mutex<Vec<String>>>);

#[derive(Default)]
struct EventFields {
    message: String,
    promise: String,
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "promise" => self.promise = format!("{value:?}"),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for UnobservedRejections {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        if fields.message.contains("no observer") {
            self.0.lock().unwrap().push(fields.promise);
        }
    }
}

/// Run `f` under a capturing subscriber and return the ids of promises
/// that were rejected with no observer.
pub(crate) fn unobserved_rejections<F: FnOnce()>(f: F) -> Vec<String> {
    let captured = UnobservedRejections::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());

    tracing::subscriber::with_default(subscriber, f);

    let ids = captured.0.lock().unwrap().clone();
    ids
}
