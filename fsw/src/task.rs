// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::RefCell;
use std::rc::Rc;

use obdh::DataStore;
use sched::time::Clock;

use crate::state::StateManager;

/// A periodic flight software task.
///
/// Implementations put their domain logic in `main_task`; the scheduler
/// only ever calls [`Task::run`], which swallows and logs failures so one
/// misbehaving task can never take the dispatch loop down. Task bodies
/// must not block: long operations are chunked across activations.
pub trait Task {
    /// Stable numeric identifier, unique across the registry.
    fn id(&self) -> u8;
    /// Stable name, unique across the registry; mode tables reference it.
    fn name(&self) -> &'static str;

    fn main_task(&mut self) -> crate::Result<()>;

    /// Runs `main_task`, logging any failure. The entry stays scheduled;
    /// whether to retry is the task's own business on its next activation.
    fn run(&mut self) {
        if let Err(error) = self.main_task() {
            tracing::warn!(id = self.id(), task = self.name(), %error, "task failed");
        }
    }
}

/// Shared service handles passed to every task factory.
///
/// The runtime is single-threaded and cooperative, so plain `Rc` and
/// `RefCell` suffice; no task may hold a borrow across a yield point
/// (i.e. past the end of its activation).
pub struct Services {
    pub state: Rc<StateManager>,
    pub store: Rc<RefCell<DataStore>>,
    pub clock: Clock,
}

pub type TaskFactory = Box<dyn Fn(&Services) -> Box<dyn Task>>;

/// Maps task names to factories; consumed once when the state manager
/// starts and instantiates every task.
#[derive(Default)]
pub struct TaskRegistry {
    entries: Vec<(&'static str, TaskFactory)>,
}

// === impl TaskRegistry ===

impl TaskRegistry {
    #[must_use]
    pub fn new() -> TaskRegistry {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&Services) -> Box<dyn Task> + 'static,
    {
        self.entries.push((name, Box::new(factory)));
    }

    pub(crate) fn into_entries(self) -> Vec<(&'static str, TaskFactory)> {
        self.entries
    }
}
