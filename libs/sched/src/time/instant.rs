// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;

/// A count of clock ticks.
///
/// The real-time span of one tick is defined by the [`Clock`] the ticks were
/// read from, see [`Clock::tick_duration`].
///
/// [`Clock`]: crate::time::Clock
/// [`Clock::tick_duration`]: crate::time::Clock::tick_duration
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticks(pub u64);

/// A measurement of a monotonically nondecreasing [`Clock`], in ticks since
/// the clock's origin (boot).
///
/// [`Clock`]: crate::time::Clock
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(Ticks);

// === impl Ticks ===

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    #[must_use]
    pub fn saturating_add(self, rhs: Ticks) -> Ticks {
        Ticks(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub fn max(self, rhs: Ticks) -> Ticks {
        Ticks(self.0.max(rhs.0))
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

// === impl Instant ===

impl Instant {
    pub const ORIGIN: Instant = Instant(Ticks(0));

    #[inline]
    #[must_use]
    pub const fn from_ticks(ticks: Ticks) -> Instant {
        Instant(ticks)
    }

    #[inline]
    #[must_use]
    pub const fn as_ticks(self) -> Ticks {
        self.0
    }

    /// Returns the instant `ticks` after `self`, saturating at the clock's
    /// representable maximum.
    #[must_use]
    pub fn saturating_add(self, ticks: Ticks) -> Instant {
        Instant(self.0.saturating_add(ticks))
    }

    /// Returns the ticks elapsed between `earlier` and `self`, or
    /// `Ticks::ZERO` when `earlier` is actually later.
    #[must_use]
    pub fn saturating_since(self, earlier: Instant) -> Ticks {
        Ticks(self.0.0.saturating_sub(earlier.0.0))
    }
}
