// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::RefCell;
use std::rc::Rc;

use obdh::{DataStore, Record, Value};
use sched::time::Clock;

use crate::task::{Services, Task};

/// Tag of the inertial telemetry stream.
pub const IMU_STREAM: &str = "imu";
const IMU_FIELDS: [&str; 10] = ["t", "ax", "ay", "az", "mx", "my", "mz", "gx", "gy", "gz"];
const IMU_FORMAT: &str = "Ifffffffff";
const IMU_LINE_LIMIT: u64 = 100;

/// One inertial measurement: acceleration, magnetic field, angular rate.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub mag: [f32; 3],
    pub gyro: [f32; 3],
}

/// The IMU driver seam; the concrete device driver lives outside the core.
pub trait ImuSensor {
    fn sample(&mut self) -> ImuSample;
}

/// Samples the IMU and appends the reading to the `imu` telemetry stream,
/// registering the stream on first use.
pub struct ImuTask {
    store: Rc<RefCell<DataStore>>,
    clock: Clock,
    sensor: Box<dyn ImuSensor>,
}

/// Deterministic stand-in sensor for ground testing: a slow sawtooth on
/// every axis.
pub struct SyntheticImu {
    step: u32,
}

// === impl ImuTask ===

impl ImuTask {
    #[must_use]
    pub fn new(services: &Services, sensor: Box<dyn ImuSensor>) -> ImuTask {
        Self {
            store: Rc::clone(&services.store),
            clock: services.clock.clone(),
            sensor,
        }
    }
}

impl Task for ImuTask {
    fn id(&self) -> u8 {
        0x03
    }

    fn name(&self) -> &'static str {
        super::IMU
    }

    fn main_task(&mut self) -> crate::Result<()> {
        let mut store = self.store.borrow_mut();
        if !store.process_exists(IMU_STREAM) {
            store.register(IMU_STREAM, &IMU_FIELDS, IMU_FORMAT, true, IMU_LINE_LIMIT)?;
        }

        let sample = self.sensor.sample();
        tracing::debug!(?sample, "IMU reading");

        let timestamp = u32::try_from(self.clock.now_secs()).unwrap_or(u32::MAX);
        let mut values = Vec::with_capacity(IMU_FIELDS.len());
        values.push(Value::U32(timestamp));
        for axis in [sample.accel, sample.mag, sample.gyro] {
            values.extend(axis.into_iter().map(Value::F32));
        }
        store.log(IMU_STREAM, &Record(values))?;
        Ok(())
    }
}

// === impl SyntheticImu ===

impl SyntheticImu {
    #[must_use]
    pub fn new() -> SyntheticImu {
        Self { step: 0 }
    }
}

impl Default for SyntheticImu {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuSensor for SyntheticImu {
    fn sample(&mut self) -> ImuSample {
        self.step = self.step.wrapping_add(1);
        let phase = (self.step % 100) as f32 / 100.0;
        ImuSample {
            accel: [phase, -phase, 9.81],
            mag: [25.0 * phase, 25.0 * (1.0 - phase), 0.0],
            gyro: [0.1 * phase, 0.0, -0.1 * phase],
        }
    }
}
