// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::Error;
use crate::time::{Clock, Instant, Ticks};

type TaskFn = Box<dyn FnMut()>;

/// Cooperative dispatcher for periodic tasks.
///
/// Entries are dispatched when their deadline has passed, ordered by
/// (priority ascending, deadline ascending, insertion order). After a task
/// completes its deadline is advanced to `max(next_due + period, now)`:
/// a task that finishes early keeps its cadence, a task that overran skips
/// the missed activations and resynchronises instead of scheduling
/// catch-up runs.
pub struct Scheduler {
    clock: Clock,
    inner: Rc<RefCell<Inner>>,
    stopped: Cell<bool>,
    /// Guard against a misbehaving [`TimeSource`](crate::time::TimeSource):
    /// dispatch never observes time moving backwards.
    last_now: Cell<Instant>,
}

struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
    next_seq: u64,
}

struct Entry {
    id: u64,
    /// Insertion order, the final dispatch tie-break.
    seq: u64,
    priority: u8,
    period: Ticks,
    next_due: Instant,
    /// `None` while the task body is executing.
    task: Option<TaskFn>,
    /// Set when the entry was stopped while its task was running; the
    /// dispatcher removes it after the body returns.
    stopped: bool,
}

/// Cancellation handle for a scheduled entry.
///
/// `stop` is idempotent and safe to call from inside the task body itself:
/// the running activation completes normally and the entry is gone before
/// the next dispatch.
#[derive(Clone)]
pub struct TaskHandle {
    id: u64,
    inner: Weak<RefCell<Inner>>,
}

// === impl Scheduler ===

impl Scheduler {
    #[must_use]
    pub fn new(clock: Clock) -> Scheduler {
        Self {
            clock,
            inner: Rc::new(RefCell::new(Inner {
                entries: Vec::new(),
                next_id: 0,
                next_seq: 0,
            })),
            stopped: Cell::new(false),
            last_now: Cell::new(Instant::ORIGIN),
        }
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registers a periodic entry that is immediately due.
    pub fn schedule<F>(&self, frequency_hz: f64, priority: u8, task: F) -> crate::Result<TaskHandle>
    where
        F: FnMut() + 'static,
    {
        let period = self.period_from_hz(frequency_hz)?;
        Ok(self.insert(period, priority, self.clock.now(), Box::new(task)))
    }

    /// Registers a periodic entry whose first activation is deferred by one
    /// period.
    pub fn schedule_later<F>(
        &self,
        frequency_hz: f64,
        priority: u8,
        task: F,
    ) -> crate::Result<TaskHandle>
    where
        F: FnMut() + 'static,
    {
        let period = self.period_from_hz(frequency_hz)?;
        let first = self.clock.now().saturating_add(period);
        Ok(self.insert(period, priority, first, Box::new(task)))
    }

    /// The number of live (non-stopped) entries.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| !entry.stopped)
            .count()
    }

    /// Runs dispatch until [`Scheduler::stop`] is called or no entries
    /// remain. Between ticks the clock parks until the earliest deadline.
    pub fn run(&self) {
        self.stopped.set(false);
        tracing::debug!(clock = %self.clock, "scheduler running");
        loop {
            let (_, next_deadline) = self.tick();
            if self.stopped.get() {
                break;
            }
            let Some(next_deadline) = next_deadline else {
                tracing::debug!("no entries remain, scheduler exiting");
                break;
            };
            self.clock.park_until(next_deadline);
        }
    }

    /// Requests `run` to return after the current tick. Safe to call from
    /// inside a task body.
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    /// One dispatch pass: runs every entry due at the time the pass started
    /// and returns how many ran plus the earliest upcoming deadline.
    ///
    /// Entries stopped while the pass is underway are skipped for the rest
    /// of it; entries scheduled while it is underway first run on a later
    /// pass.
    pub fn tick(&self) -> (usize, Option<Instant>) {
        let now = self.observe_now();

        // Snapshot of the due set; dispatch order is (priority, deadline,
        // insertion order).
        let mut due: Vec<(u8, Instant, u64, u64)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| !entry.stopped && entry.next_due <= now)
            .map(|entry| (entry.priority, entry.next_due, entry.seq, entry.id))
            .collect();
        due.sort_unstable();

        let mut executed = 0;
        for &(_, _, _, id) in &due {
            // The entry may have been stopped by an earlier task in this
            // same pass (a mode switch does exactly that).
            let Some(mut task) = self.checkout(id) else {
                continue;
            };
            task();
            executed += 1;
            self.checkin(id, task);
        }

        let next_deadline = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| !entry.stopped)
            .map(|entry| entry.next_due)
            .min();
        (executed, next_deadline)
    }

    fn period_from_hz(&self, frequency_hz: f64) -> crate::Result<Ticks> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(Error::InvalidFrequency(frequency_hz));
        }
        let period = Duration::try_from_secs_f64(1.0 / frequency_hz)
            .map_err(|_| Error::InvalidFrequency(frequency_hz))?;
        // Sub-tick frequencies degrade to one activation per tick.
        Ok(self.clock.duration_to_ticks(period).max(Ticks(1)))
    }

    fn insert(&self, period: Ticks, priority: u8, next_due: Instant, task: TaskFn) -> TaskHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        tracing::trace!(id, priority, ?period, ?next_due, "scheduling entry");
        inner.entries.push(Entry {
            id,
            seq,
            priority,
            period,
            next_due,
            task: Some(task),
            stopped: false,
        });
        TaskHandle {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Takes the task function out of entry `id` for execution, or `None`
    /// if the entry is gone, stopped, or (impossibly) already running.
    fn checkout(&self, id: u64) -> Option<TaskFn> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.entries.iter_mut().find(|entry| entry.id == id)?;
        if entry.stopped {
            return None;
        }
        entry.task.take()
    }

    /// Returns the task function after execution and advances the deadline,
    /// unless the entry was stopped mid-run in which case it is removed.
    fn checkin(&self, id: u64, task: TaskFn) {
        // Re-read the clock so an overrunning task resynchronises rather
        // than bursting to catch up.
        let now = self.observe_now();
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.entries.iter().position(|entry| entry.id == id) else {
            return;
        };
        if inner.entries[index].stopped {
            tracing::trace!(id, "entry stopped from within its task body");
            inner.entries.remove(index);
            return;
        }
        let entry = &mut inner.entries[index];
        entry.next_due = entry.next_due.saturating_add(entry.period).max(now);
        entry.task = Some(task);
    }

    fn observe_now(&self) -> Instant {
        let mut now = self.clock.now();
        if now < self.last_now.get() {
            tracing::warn!(clock = %self.clock, "time went backwards!");
            now = self.last_now.get();
        } else {
            self.last_now.set(now);
        }
        now
    }
}

// === impl TaskHandle ===

impl TaskHandle {
    /// Removes the entry. A no-op when the entry is already gone.
    pub fn stop(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        let Some(index) = inner.entries.iter().position(|entry| entry.id == self.id) else {
            return;
        };
        if inner.entries[index].task.is_some() {
            inner.entries.remove(index);
        } else {
            // Currently executing; the dispatcher removes it on return.
            inner.entries[index].stopped = true;
        }
        tracing::trace!(id = self.id, "stopped entry");
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let inner = inner.borrow();
        inner
            .entries
            .iter()
            .any(|entry| entry.id == self.id && !entry.stopped)
    }

    /// The entry's current deadline, or `None` when it is no longer
    /// scheduled.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        let inner = self.inner.upgrade()?;
        let inner = inner.borrow();
        inner
            .entries
            .iter()
            .find(|entry| entry.id == self.id && !entry.stopped)
            .map(|entry| entry.next_due)
    }
}
