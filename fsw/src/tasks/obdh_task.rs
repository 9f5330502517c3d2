// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::RefCell;
use std::rc::Rc;

use obdh::DataStore;

use crate::config;
use crate::state::StateManager;
use crate::task::{Services, Task};

/// Drives the data store through the mission.
///
/// In STARTUP the task brings up the mass storage: it wipes the previous
/// mission's files, rebuilds the registry from whatever survives on disk,
/// and then requests the switch to NOMINAL. From then on every activation
/// runs the deletion queue of acknowledged telemetry files.
pub struct ObdhTask {
    state: Rc<StateManager>,
    store: Rc<RefCell<DataStore>>,
    scanned: bool,
}

// === impl ObdhTask ===

impl ObdhTask {
    #[must_use]
    pub fn new(services: &Services) -> ObdhTask {
        Self {
            state: Rc::clone(&services.state),
            store: Rc::clone(&services.store),
            scanned: false,
        }
    }
}

impl Task for ObdhTask {
    fn id(&self) -> u8 {
        0x02
    }

    fn name(&self) -> &'static str {
        super::OBDH
    }

    fn main_task(&mut self) -> crate::Result<()> {
        if self.state.current_mode() == Some(config::STARTUP) {
            if !self.scanned {
                let mut store = self.store.borrow_mut();
                store.delete_all_files()?;
                store.scan()?;
                self.scanned = true;
            }
            // Storage is up; the nominal task set can take over. The
            // borrow above is released before the transition so freshly
            // scheduled tasks see a free store.
            self.state.switch_to(config::NOMINAL)?;
        } else {
            self.store.borrow_mut().clean_up();
        }
        Ok(())
    }
}
