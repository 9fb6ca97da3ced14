//! Demo promise chains driven by the event loop.

use std::cell::RefCell;
use std::rc::Rc;

use pledge_core::{firstly, PledgeError, Promise, PromiseState};
use pledge_runtime::{after, timeout, EventLoop};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one scenario after the loop has gone idle.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: &'static str,

    /// Final state of the chain's last promise.
    pub state: PromiseState,

    /// The value or error, rendered for display.
    pub detail: String,

    /// For rejected chains, whether retrying could plausibly succeed.
    pub recoverable: Option<bool>,
}

/// A chain under construction: its name and last promise.
struct Scenario {
    name: &'static str,
    end: Promise<String, PledgeError>,
}

impl Scenario {
    fn report(&self) -> ScenarioReport {
        let (detail, recoverable) = match self.end.outcome() {
            Some(Ok(value)) => (value, None),
            Some(Err(error)) => {
                let recoverable = error.is_recoverable();
                warn!(
                    "Scenario {} failed ({}): {}",
                    self.name,
                    if recoverable { "retryable" } else { "permanent" },
                    error
                );
                (error.to_string(), Some(recoverable))
            }
            None => ("still pending".to_string(), None),
        };
        ScenarioReport {
            name: self.name,
            state: self.end.state(),
            detail,
            recoverable,
        }
    }
}

/// Build every scenario on `event_loop`, run it to idle and report.
pub fn run_all(event_loop: &EventLoop) -> anyhow::Result<Vec<ScenarioReport>> {
    let scenarios = vec![
        doubling(event_loop),
        flattening(event_loop),
        timing_out(event_loop),
        recovering(event_loop),
    ];

    let stats = event_loop.run_until_idle()?;
    info!(
        "⏱️  Loop idle after {} tasks at {}ms",
        stats.tasks_run, stats.final_time_ms
    );

    Ok(scenarios.iter().map(Scenario::report).collect())
}

fn doubling(event_loop: &EventLoop) -> Scenario {
    let shown = Rc::new(RefCell::new(None));
    let sink = shown.clone();

    let end = firstly(|| after::<i32, PledgeError>(event_loop, 10, 1))
        .map(|v| v * 2)
        .map(|v| format!("n={v}"))
        .tap(move |s| *sink.borrow_mut() = Some(s))
        .map(move |()| shown.borrow().clone().unwrap_or_default());

    Scenario {
        name: "doubling",
        end,
    }
}

fn flattening(event_loop: &EventLoop) -> Scenario {
    let next_loop = event_loop.clone();

    let end = after::<i32, PledgeError>(event_loop, 5, 1)
        .flat_map(move |x| after(&next_loop, 20, x + 1))
        .map(|v: i32| v.to_string());

    Scenario {
        name: "flattening",
        end,
    }
}

fn timing_out(event_loop: &EventLoop) -> Scenario {
    let next_loop = event_loop.clone();

    let end = after::<&str, PledgeError>(event_loop, 5, "request")
        .flat_map(move |_| timeout::<&str>(&next_loop, 30))
        .map(|response| response.to_string())
        .finally(|| info!("🔌 Request chain settled"));
    end.catch_error(|error| warn!("Request failed: {}", error));

    Scenario {
        name: "timing_out",
        end,
    }
}

fn recovering(event_loop: &EventLoop) -> Scenario {
    let end = timeout::<i32>(event_loop, 15)
        .recover(|error| {
            warn!("Falling back after: {}", error);
            0
        })
        .map(|v| format!("fallback={v}"));

    Scenario {
        name: "recovering",
        end,
    }
}
