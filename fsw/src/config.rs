// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Declarative mode tables.
//!
//! A [`ModeConfig`] fixes, per vehicle mode, which tasks run at which
//! cadence and priority, and which modes may follow. The configuration is
//! built at wiring time and injected into the
//! [`StateManager`](crate::state::StateManager); nothing in here touches
//! the task implementations themselves.

use crate::state::StateManager;
use crate::tasks;

pub const STARTUP: &str = "STARTUP";
pub const NOMINAL: &str = "NOMINAL";
pub const SAFE: &str = "SAFE";

/// Invoked when a mode is entered or exited, between task activations.
pub type ModeHook = fn(&StateManager);

/// One row of a mode's task table.
#[derive(Copy, Clone, Debug)]
pub struct TaskSlot {
    pub task: &'static str,
    pub frequency_hz: f64,
    pub priority: u8,
    /// Defer the first activation by one period.
    pub schedule_later: bool,
}

/// A named vehicle mode: its task table (in activation order) and its
/// permitted successors.
pub struct Mode {
    pub name: &'static str,
    pub tasks: Vec<TaskSlot>,
    pub moves_to: Vec<&'static str>,
    pub on_enter: Option<ModeHook>,
    pub on_exit: Option<ModeHook>,
}

pub struct ModeConfig {
    modes: Vec<Mode>,
}

// === impl TaskSlot ===

impl TaskSlot {
    #[must_use]
    pub fn new(task: &'static str, frequency_hz: f64, priority: u8) -> TaskSlot {
        Self {
            task,
            frequency_hz,
            priority,
            schedule_later: false,
        }
    }

    #[must_use]
    pub fn later(mut self) -> TaskSlot {
        self.schedule_later = true;
        self
    }
}

// === impl Mode ===

impl Mode {
    #[must_use]
    pub fn new(name: &'static str, tasks: Vec<TaskSlot>, moves_to: Vec<&'static str>) -> Mode {
        Self {
            name,
            tasks,
            moves_to,
            on_enter: None,
            on_exit: None,
        }
    }

    #[must_use]
    pub fn on_enter(mut self, hook: ModeHook) -> Mode {
        self.on_enter = Some(hook);
        self
    }

    #[must_use]
    pub fn on_exit(mut self, hook: ModeHook) -> Mode {
        self.on_exit = Some(hook);
        self
    }
}

// === impl ModeConfig ===

impl ModeConfig {
    #[must_use]
    pub fn new(modes: Vec<Mode>) -> ModeConfig {
        Self { modes }
    }

    #[must_use]
    pub fn mode(&self, name: &str) -> Option<&Mode> {
        self.modes.iter().find(|mode| mode.name == name)
    }

    pub fn mode_names(&self) -> impl Iterator<Item = &'static str> {
        self.modes.iter().map(|mode| mode.name)
    }
}

/// The flight mode table.
///
/// STARTUP runs the bare minimum until OBDH has brought up the mass
/// storage and requests NOMINAL. SAFE keeps only the watchdog-ish
/// monitoring and attitude sensing alive at a high cadence.
#[must_use]
pub fn flight_config() -> ModeConfig {
    ModeConfig::new(vec![
        Mode::new(
            STARTUP,
            vec![
                TaskSlot::new(tasks::MONITOR, 1.0, 1),
                TaskSlot::new(tasks::TIMING, 1.0, 2),
                TaskSlot::new(tasks::OBDH, 0.25, 3),
            ],
            vec![NOMINAL],
        ),
        Mode::new(
            NOMINAL,
            vec![
                TaskSlot::new(tasks::MONITOR, 2.0, 2),
                TaskSlot::new(tasks::TIMING, 1.5, 2),
                TaskSlot::new(tasks::OBDH, 1.0, 3),
                TaskSlot::new(tasks::DOWNLINK, 0.5, 4),
                TaskSlot::new(tasks::IMU, 1.0, 5).later(),
            ],
            vec![SAFE],
        ),
        Mode::new(
            SAFE,
            vec![
                TaskSlot::new(tasks::MONITOR, 20.0, 1),
                TaskSlot::new(tasks::IMU, 2.0, 3),
            ],
            vec![NOMINAL],
        )
        .on_enter(|_| tracing::warn!("entering SAFE mode"))
        .on_exit(|_| tracing::warn!("leaving SAFE mode")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_config_transitions_form_the_expected_cycle() {
        let config = flight_config();
        assert_eq!(config.mode(STARTUP).unwrap().moves_to, [NOMINAL]);
        assert_eq!(config.mode(NOMINAL).unwrap().moves_to, [SAFE]);
        assert_eq!(config.mode(SAFE).unwrap().moves_to, [NOMINAL]);
        assert!(config.mode("LAUNCH").is_none());
    }

    #[test]
    fn only_imu_is_deferred_in_nominal() {
        let config = flight_config();
        let nominal = config.mode(NOMINAL).unwrap();
        for slot in &nominal.tasks {
            assert_eq!(slot.schedule_later, slot.task == tasks::IMU);
        }
    }
}
