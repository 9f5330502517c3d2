// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Fixed-size framed transport for the UART link to the payload
//! co-processor.
//!
//! Every unit on the wire is a 64-byte [`Frame`]: a 4-byte little-endian
//! metadata header (sequence number, frame kind, payload size) followed by
//! a 60-byte zero-padded payload. A logical [`Message`] travels as one
//! HEADER frame announcing its type and packet count, then that many DATA
//! frames, each individually acknowledged. The protocol is strictly
//! stop-and-wait: the sender never advances past an un-acked frame and the
//! receiver never accepts an out-of-order one.

mod error;
mod frame;
mod message;
mod transport;

pub use error::Error;
pub use frame::{FRAME_SIZE, Frame, FrameKind, Meta, PAYLOAD_PER_FRAME};
pub use message::{MAX_PACKETS, Message};
pub use transport::{Transport, Uart};

pub type Result<T> = core::result::Result<T, Error>;
