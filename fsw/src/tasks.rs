// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The flight task set.
//!
//! Every task is constructed exactly once by the state manager from the
//! registry built here; mode tables reference tasks by the names exported
//! below.

mod downlink;
mod imu;
mod monitor;
mod obdh_task;
mod timing;

pub use downlink::{DownlinkTask, DownlinkUart};
pub use imu::{IMU_STREAM, ImuSample, ImuSensor, ImuTask, SyntheticImu};
pub use monitor::MonitorTask;
pub use obdh_task::ObdhTask;
pub use timing::TimingTask;

use crate::task::TaskRegistry;
use framed::Transport;

pub const MONITOR: &str = "MONITOR";
pub const TIMING: &str = "TIMING";
pub const OBDH: &str = "OBDH";
pub const IMU: &str = "IMU";
pub const DOWNLINK: &str = "DOWNLINK";

/// The flight task registry.
///
/// `downlink` is the transport to the payload co-processor, when one is
/// wired; without it the downlink task idles.
#[must_use]
pub fn flight_registry(downlink: Option<Transport<DownlinkUart>>) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register(MONITOR, |_services| Box::new(MonitorTask::new()));
    registry.register(TIMING, |services| Box::new(TimingTask::new(services)));
    registry.register(OBDH, |services| Box::new(ObdhTask::new(services)));
    registry.register(IMU, |services| {
        Box::new(ImuTask::new(services, Box::new(SyntheticImu::new())))
    });
    // The factory is `Fn` but the transport is moved in, so hand it over
    // through a cell.
    let downlink = std::cell::RefCell::new(downlink);
    registry.register(DOWNLINK, move |services| {
        Box::new(DownlinkTask::new(services, downlink.borrow_mut().take()))
    });
    registry
}
