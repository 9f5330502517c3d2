// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::rc::Rc;

use sched::time::Clock;

use crate::state::StateManager;
use crate::task::{Services, Task};

/// Reference time distribution and bookkeeping.
pub struct TimingTask {
    state: Rc<StateManager>,
    clock: Clock,
}

// === impl TimingTask ===

impl TimingTask {
    #[must_use]
    pub fn new(services: &Services) -> TimingTask {
        Self {
            state: Rc::clone(&services.state),
            clock: services.clock.clone(),
        }
    }
}

impl Task for TimingTask {
    fn id(&self) -> u8 {
        0x01
    }

    fn name(&self) -> &'static str {
        super::TIMING
    }

    fn main_task(&mut self) -> crate::Result<()> {
        tracing::info!(
            mode = self.state.current_mode().unwrap_or("<none>"),
            uptime_secs = self.clock.now_secs(),
            "reference time"
        );
        Ok(())
    }
}
