// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use framed::{Message, Transport, Uart};
use obdh::DataStore;

use crate::task::{Services, Task};
use crate::tasks::imu::IMU_STREAM;

/// Type-erased UART so the wiring can decide on the concrete device.
pub type DownlinkUart = Box<dyn Uart>;

/// Message type for a telemetry file shipped to the co-processor.
const MSG_TM_FILE: u8 = 0x01;

/// Ships closed telemetry files to the payload co-processor, one file per
/// activation.
///
/// A file is leased from the data store, framed as a single message, and
/// only acknowledged (and thereby queued for deletion) once the peer
/// acked the whole transfer. A failed transfer leaves the lease in place
/// and surfaces the error to the task wrapper; the next activation moves
/// on to the following file.
pub struct DownlinkTask {
    store: Rc<RefCell<DataStore>>,
    transport: Option<Transport<DownlinkUart>>,
}

// === impl DownlinkTask ===

impl DownlinkTask {
    #[must_use]
    pub fn new(services: &Services, transport: Option<Transport<DownlinkUart>>) -> DownlinkTask {
        Self {
            store: Rc::clone(&services.store),
            transport,
        }
    }
}

impl Task for DownlinkTask {
    fn id(&self) -> u8 {
        0x04
    }

    fn name(&self) -> &'static str {
        super::DOWNLINK
    }

    fn main_task(&mut self) -> crate::Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            tracing::trace!("no co-processor link wired, idling");
            return Ok(());
        };
        if !self.store.borrow().process_exists(IMU_STREAM) {
            return Ok(());
        }
        let Some(path) = self.store.borrow_mut().request_tm_path(IMU_STREAM, false)? else {
            return Ok(());
        };

        let data = fs::read(&path)?;
        if data.is_empty() {
            // Nothing worth transmitting; acknowledge so clean-up reclaims it.
            self.store.borrow_mut().notify_tm_path(IMU_STREAM, &path)?;
            return Ok(());
        }

        let message = Message::new(MSG_TM_FILE, data)?;
        tracing::info!(path = %path.display(), len = message.len(), "downlinking telemetry file");
        transport.send_message(&message)?;
        self.store.borrow_mut().notify_tm_path(IMU_STREAM, &path)?;
        Ok(())
    }
}
