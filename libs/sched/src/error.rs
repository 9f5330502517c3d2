// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#[derive(Debug, PartialEq, onlyerror::Error)]
pub enum Error {
    /// Task frequencies must be finite, positive and representable as a
    /// whole number of clock ticks.
    #[error("invalid task frequency: {0} Hz")]
    InvalidFrequency(f64),
}
