//! Cooperative single-threaded event loop.
//!
//! Tasks are closures scheduled at a delay on a virtual clock. They run one
//! at a time in (due time, scheduling order) and may schedule further tasks.
//! Nothing sleeps: running a task advances the clock straight to its due time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pledge_core::{PledgeError, Result};
use serde::{Deserialize, Serialize};

use crate::config::LoopConfig;

type Task = Box<dyn FnOnce()>;

struct LoopInner {
    config: LoopConfig,
    now_ms: u64,
    next_seq: u64,
    /// Keyed by (due time, scheduling sequence).
    queue: BTreeMap<(u64, u64), Task>,
}

/// Handle to an event loop. Clones drive the same queue.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<RefCell<LoopInner>>,
}

/// Summary of a `run_until_idle` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of tasks executed.
    pub tasks_run: usize,

    /// Virtual clock reading when the queue ran dry.
    pub final_time_ms: u64,
}

impl EventLoop {
    /// Create an event loop.
    pub fn new(config: LoopConfig) -> Self {
        let now_ms = config.start_time_ms;
        Self {
            inner: Rc::new(RefCell::new(LoopInner {
                config,
                now_ms,
                next_seq: 0,
                queue: BTreeMap::new(),
            })),
        }
    }

    /// Get the loop configuration.
    pub fn config(&self) -> LoopConfig {
        self.inner.borrow().config.clone()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    /// Number of tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Schedule `task` to run `delay_ms` after the current virtual time.
    pub fn schedule<F>(&self, delay_ms: u64, task: F)
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let due_ms = inner.now_ms.saturating_add(delay_ms);
        let seq = inner.next_seq;
        inner.next_seq = inner.next_seq.wrapping_add(1);
        inner.queue.insert((due_ms, seq), Box::new(task));

        tracing::trace!("Scheduled task {} due at {}ms", seq, due_ms);
    }

    /// Run the next due task. Returns false if the queue was empty.
    pub fn run_once(&self) -> bool {
        let task = {
            let mut inner = self.inner.borrow_mut();
            let Some(((due_ms, seq), task)) = inner.queue.pop_first() else {
                return false;
            };
            inner.now_ms = inner.now_ms.max(due_ms);
            tracing::trace!("Running task {} at {}ms", seq, inner.now_ms);
            task
        };

        // Run outside the borrow so the task can schedule more work.
        task();
        true
    }

    /// Run tasks until none remain.
    ///
    /// Fails with [`PledgeError::LoopExhausted`] once `max_tasks` tasks have
    /// run and more are still queued.
    pub fn run_until_idle(&self) -> Result<RunStats> {
        let max_tasks = self.inner.borrow().config.max_tasks;
        let mut tasks_run = 0;

        while self.pending_tasks() > 0 {
            if tasks_run >= max_tasks {
                tracing::warn!(
                    "Event loop stopped after {} tasks with {} still queued",
                    tasks_run,
                    self.pending_tasks()
                );
                return Err(PledgeError::LoopExhausted { max_tasks });
            }
            self.run_once();
            tasks_run += 1;
        }

        Ok(RunStats {
            tasks_run,
            final_time_ms: self.now_ms(),
        })
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}
