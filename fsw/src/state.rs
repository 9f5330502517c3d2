// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use obdh::DataStore;
use sched::{Scheduler, TaskHandle};

use crate::config::ModeConfig;
use crate::task::{Services, Task, TaskRegistry};
use crate::Error;

/// Owner of the vehicle mode.
///
/// The state manager instantiates every registered task exactly once, and
/// on every validated transition rewrites the scheduler's active set from
/// the new mode's task table. It is the only mutator of that set: tasks
/// request transitions through [`StateManager::switch_to`] but never touch
/// the scheduler directly.
///
/// A failed transition leaves the machine in its prior mode with the prior
/// active set untouched.
pub struct StateManager {
    /// Self-handle so task factories can be given an owning reference.
    me: Weak<StateManager>,
    scheduler: Rc<Scheduler>,
    store: Rc<RefCell<DataStore>>,
    config: ModeConfig,
    /// Consumed by `init`; `None` afterwards.
    registry: RefCell<Option<TaskRegistry>>,
    tasks: RefCell<BTreeMap<&'static str, Rc<RefCell<Box<dyn Task>>>>>,
    /// Active entries in mode-table order.
    scheduled: RefCell<Vec<(&'static str, TaskHandle)>>,
    current: Cell<Option<&'static str>>,
    previous: Cell<Option<&'static str>>,
}

// === impl StateManager ===

impl StateManager {
    #[must_use]
    pub fn new(
        scheduler: Rc<Scheduler>,
        store: Rc<RefCell<DataStore>>,
        config: ModeConfig,
        registry: TaskRegistry,
    ) -> Rc<StateManager> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            scheduler,
            store,
            config,
            registry: RefCell::new(Some(registry)),
            tasks: RefCell::new(BTreeMap::new()),
            scheduled: RefCell::new(Vec::new()),
            current: Cell::new(None),
            previous: Cell::new(None),
        })
    }

    /// Instantiates every registered task and enters `initial_mode`.
    ///
    /// Separate from [`StateManager::start`] so tests can drive the
    /// scheduler tick by tick.
    pub fn init(&self, initial_mode: &str) -> crate::Result<()> {
        let Some(registry) = self.registry.borrow_mut().take() else {
            return Err(Error::AlreadyStarted);
        };

        let services = Services {
            // Always upgradable: the only constructor puts us inside an Rc.
            state: self.me.upgrade().expect("state manager outlived its Rc"),
            store: Rc::clone(&self.store),
            clock: self.scheduler.clock().clone(),
        };
        let mut seen_ids = BTreeMap::new();
        for (name, factory) in registry.into_entries() {
            let task = factory(&services);
            if let Some(previous) = seen_ids.insert(task.id(), name) {
                tracing::error!(task = name, clashes_with = previous, "duplicate task id");
                return Err(Error::DuplicateTaskId(task.id()));
            }
            if self
                .tasks
                .borrow_mut()
                .insert(name, Rc::new(RefCell::new(task)))
                .is_some()
            {
                return Err(Error::DuplicateTask(name.to_owned()));
            }
        }

        self.switch_to(initial_mode)
    }

    /// Boots into `initial_mode` and hands the thread to the scheduler.
    /// Returns only once the scheduler stops.
    pub fn start(&self, initial_mode: &str) -> crate::Result<()> {
        self.init(initial_mode)?;
        self.scheduler.run();
        Ok(())
    }

    /// Performs a validated transition to `new_mode`.
    ///
    /// The whole table of the target mode is validated up front, so a
    /// rejected transition has no effect at all. Safe to call from within
    /// a running task: the old entries stop immediately and the new set
    /// first runs on a later dispatch pass.
    pub fn switch_to(&self, new_mode: &str) -> crate::Result<()> {
        let mode = self
            .config
            .mode(new_mode)
            .ok_or_else(|| Error::UnknownMode(new_mode.to_owned()))?;

        // Everything but the very first activation must be a permitted
        // transition.
        if let Some(current) = self.current.get() {
            let permitted = self
                .config
                .mode(current)
                .is_some_and(|mode| mode.moves_to.iter().any(|successor| *successor == new_mode));
            if !permitted {
                return Err(Error::InvalidTransition {
                    from: current.to_owned(),
                    to: new_mode.to_owned(),
                });
            }
        }

        // Validate the whole target table before tearing the old one down,
        // so the active set can never end up half-built.
        {
            let tasks = self.tasks.borrow();
            for slot in &mode.tasks {
                if !tasks.contains_key(slot.task) {
                    return Err(Error::UnknownTask(slot.task.to_owned()));
                }
            }
        }

        if let Some(current) = self.current.get() {
            if let Some(hook) = self.config.mode(current).and_then(|mode| mode.on_exit) {
                hook(self);
            }
        }

        for (name, handle) in self.scheduled.borrow_mut().drain(..) {
            tracing::trace!(task = name, "stopping");
            handle.stop();
        }

        // Table order doubles as the insertion-order tie break.
        for slot in &mode.tasks {
            let task = Rc::clone(
                self.tasks
                    .borrow()
                    .get(slot.task)
                    .ok_or_else(|| Error::UnknownTask(slot.task.to_owned()))?,
            );
            let task_fn = move || task.borrow_mut().run();
            let handle = if slot.schedule_later {
                self.scheduler
                    .schedule_later(slot.frequency_hz, slot.priority, task_fn)?
            } else {
                self.scheduler
                    .schedule(slot.frequency_hz, slot.priority, task_fn)?
            };
            self.scheduled.borrow_mut().push((slot.task, handle));
        }

        if let Some(hook) = mode.on_enter {
            hook(self);
        }

        self.previous.set(self.current.get());
        self.current.set(Some(mode.name));
        tracing::info!(mode = mode.name, "switched mode");
        Ok(())
    }

    #[must_use]
    pub fn current_mode(&self) -> Option<&'static str> {
        self.current.get()
    }

    #[must_use]
    pub fn previous_mode(&self) -> Option<&'static str> {
        self.previous.get()
    }

    /// The active entries, in the order the mode table scheduled them.
    #[must_use]
    pub fn scheduled_tasks(&self) -> Vec<(&'static str, TaskHandle)> {
        self.scheduled.borrow().clone()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, TaskSlot};
    use sched::time::{Clock, Ticks};
    use std::cell::Cell;
    use std::time::Duration;

    struct NamedTask {
        id: u8,
        name: &'static str,
        runs: Rc<Cell<u32>>,
    }

    impl Task for NamedTask {
        fn id(&self) -> u8 {
            self.id
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn main_task(&mut self) -> crate::Result<()> {
            self.runs.set(self.runs.get() + 1);
            Ok(())
        }
    }

    struct Fixture {
        state: Rc<StateManager>,
        scheduler: Rc<Scheduler>,
        source: Rc<sched::time::ManualSource>,
        runs: BTreeMap<&'static str, Rc<Cell<u32>>>,
        _dir: tempfile::TempDir,
    }

    fn fixture(config: ModeConfig, task_names: &[(&'static str, u8)]) -> Fixture {
        let (clock, source) = Clock::manual(Duration::from_millis(1));
        let scheduler = Rc::new(Scheduler::new(clock.clone()));
        let dir = tempfile::tempdir().unwrap();
        let store = Rc::new(RefCell::new(
            DataStore::new(dir.path().join("sd"), clock).unwrap(),
        ));

        let mut runs = BTreeMap::new();
        let mut registry = TaskRegistry::new();
        for &(name, id) in task_names {
            let counter = Rc::new(Cell::new(0));
            runs.insert(name, Rc::clone(&counter));
            registry.register(name, move |_services| {
                Box::new(NamedTask {
                    id,
                    name,
                    runs: Rc::clone(&counter),
                })
            });
        }

        let state = StateManager::new(Rc::clone(&scheduler), store, config, registry);
        Fixture {
            state,
            scheduler,
            source,
            runs,
            _dir: dir,
        }
    }

    fn two_mode_config() -> ModeConfig {
        ModeConfig::new(vec![
            Mode::new(
                "STARTUP",
                vec![TaskSlot::new("MONITOR", 1.0, 2)],
                vec!["NOMINAL"],
            ),
            Mode::new(
                "NOMINAL",
                vec![
                    TaskSlot::new("MONITOR", 2.0, 2),
                    TaskSlot::new("IMU", 1.0, 5).later(),
                ],
                vec!["STARTUP"],
            ),
        ])
    }

    #[test]
    fn init_enters_the_initial_mode_and_schedules_its_table() {
        let fixture = fixture(two_mode_config(), &[("MONITOR", 0), ("IMU", 3)]);
        fixture.state.init("STARTUP").unwrap();

        assert_eq!(fixture.state.current_mode(), Some("STARTUP"));
        assert_eq!(fixture.state.previous_mode(), None);
        let scheduled = fixture.state.scheduled_tasks();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0, "MONITOR");
        assert_eq!(fixture.scheduler.active_count(), 1);
    }

    #[test]
    fn switch_replaces_the_active_set() {
        let fixture = fixture(two_mode_config(), &[("MONITOR", 0), ("IMU", 3)]);
        fixture.state.init("STARTUP").unwrap();
        fixture.state.switch_to("NOMINAL").unwrap();

        assert_eq!(fixture.state.current_mode(), Some("NOMINAL"));
        assert_eq!(fixture.state.previous_mode(), Some("STARTUP"));
        let scheduled = fixture.state.scheduled_tasks();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(fixture.scheduler.active_count(), 2);

        // MONITOR is immediately due, the deferred IMU one period out.
        let now = fixture.scheduler.clock().now();
        assert_eq!(scheduled[0].1.next_due(), Some(now));
        assert_eq!(
            scheduled[1].1.next_due(),
            Some(now.saturating_add(Ticks(1000)))
        );
    }

    #[test]
    fn invalid_transition_changes_nothing() {
        let config = ModeConfig::new(vec![
            Mode::new(
                "STARTUP",
                vec![TaskSlot::new("MONITOR", 1.0, 2)],
                vec!["NOMINAL"],
            ),
            Mode::new("NOMINAL", vec![], vec![]),
            Mode::new("SAFE", vec![], vec![]),
        ]);
        let fixture = fixture(config, &[("MONITOR", 0)]);
        fixture.state.init("STARTUP").unwrap();
        let before = fixture.state.scheduled_tasks();

        assert!(matches!(
            fixture.state.switch_to("SAFE"),
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(fixture.state.current_mode(), Some("STARTUP"));
        assert_eq!(fixture.scheduler.active_count(), 1);
        assert!(before[0].1.is_active());

        assert!(matches!(
            fixture.state.switch_to("LAUNCH"),
            Err(Error::UnknownMode(..))
        ));
    }

    #[test]
    fn unknown_task_in_the_target_table_aborts_before_teardown() {
        let config = ModeConfig::new(vec![
            Mode::new(
                "STARTUP",
                vec![TaskSlot::new("MONITOR", 1.0, 2)],
                vec!["NOMINAL"],
            ),
            Mode::new(
                "NOMINAL",
                vec![TaskSlot::new("GHOST", 1.0, 2)],
                vec![],
            ),
        ]);
        let fixture = fixture(config, &[("MONITOR", 0)]);
        fixture.state.init("STARTUP").unwrap();

        assert!(matches!(
            fixture.state.switch_to("NOMINAL"),
            Err(Error::UnknownTask(..))
        ));
        // The old set must survive the failed transition.
        assert_eq!(fixture.state.current_mode(), Some("STARTUP"));
        assert_eq!(fixture.scheduler.active_count(), 1);
    }

    #[test]
    fn tasks_are_instantiated_once_and_survive_switches() {
        let fixture = fixture(two_mode_config(), &[("MONITOR", 0), ("IMU", 3)]);
        fixture.state.init("STARTUP").unwrap();

        fixture.scheduler.tick();
        assert_eq!(fixture.runs["MONITOR"].get(), 1);

        fixture.state.switch_to("NOMINAL").unwrap();
        fixture.scheduler.tick();
        // Rescheduling makes MONITOR immediately due again.
        assert_eq!(fixture.runs["MONITOR"].get(), 2);
        assert_eq!(fixture.runs["IMU"].get(), 0);

        fixture.source.advance(Ticks(1000));
        fixture.scheduler.tick();
        assert_eq!(fixture.runs["IMU"].get(), 1);
    }

    #[test]
    fn duplicate_registrations_are_rejected() {
        let config = two_mode_config();
        let fixture1 = fixture(config, &[("MONITOR", 0), ("MONITOR", 1)]);
        assert!(matches!(
            fixture1.state.init("STARTUP"),
            Err(Error::DuplicateTask(..))
        ));

        let config = two_mode_config();
        let fixture2 = fixture(config, &[("MONITOR", 0), ("IMU", 0)]);
        assert!(matches!(
            fixture2.state.init("STARTUP"),
            Err(Error::DuplicateTaskId(0))
        ));
    }

    #[test]
    fn init_twice_is_rejected() {
        let fixture = fixture(two_mode_config(), &[("MONITOR", 0), ("IMU", 3)]);
        fixture.state.init("STARTUP").unwrap();
        assert!(matches!(
            fixture.state.init("STARTUP"),
            Err(Error::AlreadyStarted)
        ));
    }

    #[test]
    fn enter_and_exit_hooks_fire_in_order() {
        thread_local! {
            static HOOKS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
        }

        let config = ModeConfig::new(vec![
            Mode::new("STARTUP", vec![], vec!["NOMINAL"])
                .on_exit(|_| HOOKS.with_borrow_mut(|hooks| hooks.push("exit STARTUP"))),
            Mode::new("NOMINAL", vec![], vec![])
                .on_enter(|_| HOOKS.with_borrow_mut(|hooks| hooks.push("enter NOMINAL"))),
        ]);
        let fixture = fixture(config, &[]);
        fixture.state.init("STARTUP").unwrap();
        fixture.state.switch_to("NOMINAL").unwrap();

        HOOKS.with_borrow(|hooks| assert_eq!(*hooks, ["exit STARTUP", "enter NOMINAL"]));
    }
}
