// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::task::Task;

/// System health heartbeat.
///
/// TODO: fold in the power monitor readings once the EPS driver interface
/// is finalized.
pub struct MonitorTask {
    beats: u64,
}

// === impl MonitorTask ===

impl MonitorTask {
    #[must_use]
    pub fn new() -> MonitorTask {
        Self { beats: 0 }
    }
}

impl Default for MonitorTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for MonitorTask {
    fn id(&self) -> u8 {
        0x00
    }

    fn name(&self) -> &'static str {
        super::MONITOR
    }

    fn main_task(&mut self) -> crate::Result<()> {
        self.beats += 1;
        tracing::info!(beats = self.beats, "system nominal");
        Ok(())
    }
}
