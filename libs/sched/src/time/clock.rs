// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::time::{Instant, NANOS_PER_SEC, Ticks};

/// A source of monotonic ticks.
///
/// Implementations must be monotonically nondecreasing: `now_ticks` may stall
/// but must never go backwards. `park_until` blocks the (single) execution
/// context until the deadline has been reached; it is permitted to return
/// early, the caller re-checks the clock.
pub trait TimeSource {
    fn now_ticks(&self) -> u64;
    fn park_until(&self, deadline: u64);
}

/// A named monotonic clock with a fixed tick duration.
///
/// The `tick_duration` is the `Duration` of time represented by a single
/// `u64` tick of this clock. This is in effect the precision of the clock and
/// should be set to the precision of the underlying hardware timer.
#[derive(Clone)]
pub struct Clock {
    name: &'static str,
    tick_duration: Duration,
    source: Rc<dyn TimeSource>,
}

// === impl Clock ===

impl Clock {
    /// Creates a new `Clock` from the provided `tick_duration` and tick
    /// source.
    ///
    /// # Panics
    ///
    /// Panics if `tick_duration` is zero.
    #[must_use]
    pub fn new(tick_duration: Duration, source: Rc<dyn TimeSource>) -> Clock {
        assert!(!tick_duration.is_zero(), "clock tick duration must be non-zero");
        Self {
            name: "<unnamed mystery clock>",
            tick_duration,
            source,
        }
    }

    /// The production clock: microsecond ticks counted from the moment this
    /// constructor runs, parking by putting the thread to sleep.
    #[must_use]
    pub fn monotonic() -> Clock {
        const TICK: Duration = Duration::from_micros(1);
        Clock::new(
            TICK,
            Rc::new(MonotonicSource {
                origin: std::time::Instant::now(),
                tick_duration: TICK,
            }),
        )
        .named("monotonic")
    }

    /// A manually advanced clock for tests, with the given tick duration.
    ///
    /// Parking jumps the clock straight to the deadline, so a scheduler
    /// driven by this clock runs as fast as the test harness can turn it.
    #[must_use]
    pub fn manual(tick_duration: Duration) -> (Clock, Rc<ManualSource>) {
        let source = Rc::new(ManualSource { now: Cell::new(0) });
        let ticks: Rc<dyn TimeSource> = source.clone();
        let clock = Clock::new(tick_duration, ticks).named("manual");
        (clock, source)
    }

    /// Add an arbitrary user-defined name to this `Clock`.
    ///
    /// This is generally used to describe the hardware time source backing
    /// this `Clock`.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Returns this `Clock`'s name, if it was given one using the
    /// [`Clock::named`] method.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`Duration`] of one tick of this clock.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        Instant::from_ticks(Ticks(self.source.now_ticks()))
    }

    /// Whole seconds elapsed since the clock's origin. Used for the
    /// timestamps embedded in storage file names.
    #[must_use]
    pub fn now_secs(&self) -> u64 {
        self.ticks_to_duration(self.now().as_ticks()).as_secs()
    }

    /// Blocks until `deadline`; returns immediately when it already passed.
    pub fn park_until(&self, deadline: Instant) {
        self.source.park_until(deadline.as_ticks().0);
    }

    /// Converts `duration` into ticks of this clock, rounding up so that a
    /// nonzero duration never collapses to a zero-tick wait.
    #[must_use]
    pub fn duration_to_ticks(&self, duration: Duration) -> Ticks {
        let ticks = duration.as_nanos().div_ceil(self.tick_duration.as_nanos());
        Ticks(u64::try_from(ticks).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn ticks_to_duration(&self, ticks: Ticks) -> Duration {
        let nanos = u128::from(ticks.0).saturating_mul(self.tick_duration.as_nanos());
        let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
        let subsec = u32::try_from(nanos % NANOS_PER_SEC).unwrap_or(0);
        Duration::new(secs, subsec)
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("name", &self.name)
            .field("tick_duration", &self.tick_duration)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {:?} precision", self.name, self.tick_duration)
    }
}

// === impl MonotonicSource ===

struct MonotonicSource {
    origin: std::time::Instant,
    tick_duration: Duration,
}

impl TimeSource for MonotonicSource {
    fn now_ticks(&self) -> u64 {
        let ticks = self.origin.elapsed().as_nanos() / self.tick_duration.as_nanos();
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn park_until(&self, deadline: u64) {
        let now = self.now_ticks();
        if deadline > now {
            let nanos = u128::from(deadline - now).saturating_mul(self.tick_duration.as_nanos());
            std::thread::sleep(Duration::new(
                u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX),
                u32::try_from(nanos % NANOS_PER_SEC).unwrap_or(0),
            ));
        }
    }
}

// === impl ManualSource ===

/// Test clock state: `now` only moves when a test advances it (or a park
/// jumps it forward).
pub struct ManualSource {
    now: Cell<u64>,
}

impl ManualSource {
    pub fn advance(&self, ticks: Ticks) {
        self.now.set(self.now.get().saturating_add(ticks.0));
    }
}

impl TimeSource for ManualSource {
    fn now_ticks(&self) -> u64 {
        self.now.get()
    }

    fn park_until(&self, deadline: u64) {
        self.now.set(self.now.get().max(deadline));
    }
}
