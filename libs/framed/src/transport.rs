// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;
use std::time::Duration;

use crate::frame::{FRAME_SIZE, Frame, FrameKind, PAYLOAD_PER_FRAME};
use crate::message::Message;
use crate::Error;

/// The byte-oriented device under the transport.
///
/// The transport owns the UART exclusively. Reads must be bounded: an
/// implementation blocks for at most `timeout` and then fails with
/// [`io::ErrorKind::TimedOut`], which the transport surfaces as
/// [`Error::Timeout`].
pub trait Uart {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn recv_exact(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<()>;
}

impl<U: Uart + ?Sized> Uart for Box<U> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }

    fn recv_exact(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<()> {
        (**self).recv_exact(buf, timeout)
    }
}

/// Stop-and-wait message transfer over 64-byte frames.
pub struct Transport<U> {
    uart: U,
    read_timeout: Duration,
}

// === impl Transport ===

impl<U: Uart> Transport<U> {
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

    #[must_use]
    pub fn new(uart: U) -> Transport<U> {
        Self {
            uart,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sends `message` as HEADER + DATA frames, blocking on the peer's
    /// response after each.
    ///
    /// An ACK for the outstanding sequence number advances the transfer, a
    /// NACK retransmits it, a RESET (or any unexpected frame) restarts the
    /// whole transfer from the header. A read timeout aborts with
    /// [`Error::Timeout`] and leaves the restart decision to the caller.
    pub fn send_message(&mut self, message: &Message) -> crate::Result<()> {
        let total_packets = message.num_packets();
        let mut current_seq: u16 = 0;
        loop {
            let frame = if current_seq == 0 {
                message.header_frame()
            } else {
                message.data_frame(current_seq)?
            };
            self.uart.send(frame.as_bytes())?;

            let response = self.recv_frame()?;
            let meta = response.meta()?;
            match meta.kind {
                FrameKind::Ack if meta.seq == current_seq => {
                    if current_seq == total_packets {
                        tracing::debug!(
                            message_type = message.message_type(),
                            packets = total_packets,
                            "message sent"
                        );
                        return Ok(());
                    }
                    current_seq += 1;
                }
                FrameKind::Nack => {
                    tracing::debug!(seq = current_seq, "NACK, retransmitting");
                }
                FrameKind::Reset => {
                    tracing::warn!("peer requested reset, restarting transfer");
                    current_seq = 0;
                }
                kind => {
                    tracing::warn!(%kind, seq = meta.seq, "unexpected response, restarting transfer");
                    current_seq = 0;
                }
            }
        }
    }

    /// Receives one message: a HEADER frame followed by the announced
    /// number of DATA frames, acknowledging each.
    ///
    /// A frame of the wrong type or sequence number is a protocol
    /// violation and surfaces as an error; resynchronisation is the
    /// peers' job via RESET.
    pub fn receive_message(&mut self) -> crate::Result<Message> {
        let header = self.recv_frame()?;
        let meta = header.meta()?;
        if meta.kind != FrameKind::Header {
            return Err(Error::UnexpectedFrame {
                expected: FrameKind::Header,
                got: meta.kind,
                seq: meta.seq,
            });
        }
        let (message_type, num_packets) = header.header_payload()?;
        self.uart.send(Frame::ack(meta.seq).as_bytes())?;

        let mut expected_seq = meta.seq.wrapping_add(1);
        let mut data = Vec::with_capacity(usize::from(num_packets) * PAYLOAD_PER_FRAME);
        for _ in 0..num_packets {
            let frame = self.recv_frame()?;
            let meta = frame.meta()?;
            if meta.kind != FrameKind::Data {
                return Err(Error::UnexpectedFrame {
                    expected: FrameKind::Data,
                    got: meta.kind,
                    seq: meta.seq,
                });
            }
            if meta.seq != expected_seq {
                return Err(Error::OutOfOrder {
                    expected: expected_seq,
                    got: meta.seq,
                });
            }
            self.uart.send(Frame::ack(meta.seq).as_bytes())?;
            data.extend_from_slice(&frame.payload()[..usize::from(meta.payload_size)]);
            expected_seq = expected_seq.wrapping_add(1);
        }

        tracing::debug!(message_type, packets = num_packets, len = data.len(), "message received");
        Message::new(message_type, data)
    }

    fn recv_frame(&mut self) -> crate::Result<Frame> {
        let mut bytes = [0u8; FRAME_SIZE];
        match self.uart.recv_exact(&mut bytes, self.read_timeout) {
            Ok(()) => Ok(Frame::from_bytes(bytes)),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Err(Error::Timeout),
            Err(err) => Err(err.into()),
        }
    }
}
