// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;

use crate::Error;

/// Size of every unit on the wire.
pub const FRAME_SIZE: usize = 64;
/// seq_num (u16 LE) + type (u8) + payload_size (u8).
pub const METADATA_SIZE: usize = 4;
/// Payload bytes carried by one frame.
pub const PAYLOAD_PER_FRAME: usize = FRAME_SIZE - METADATA_SIZE;
/// message_type (u8) + num_packets (u16 LE) + one reserved byte.
pub(crate) const HEADER_PAYLOAD_SIZE: u8 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Header = 0,
    Data = 1,
    Ack = 2,
    Nack = 3,
    Reset = 4,
}

/// Parsed frame metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Meta {
    pub seq: u16,
    pub kind: FrameKind,
    pub payload_size: u8,
}

/// One 64-byte wire unit, always fully materialized so that partial writes
/// cannot leak uninitialized padding.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame([u8; FRAME_SIZE]);

// === impl FrameKind ===

impl TryFrom<u8> for FrameKind {
    type Error = Error;

    fn try_from(value: u8) -> crate::Result<Self> {
        match value {
            0 => Ok(FrameKind::Header),
            1 => Ok(FrameKind::Data),
            2 => Ok(FrameKind::Ack),
            3 => Ok(FrameKind::Nack),
            4 => Ok(FrameKind::Reset),
            other => Err(Error::InvalidKind(other)),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Header => "HEADER",
            FrameKind::Data => "DATA",
            FrameKind::Ack => "ACK",
            FrameKind::Nack => "NACK",
            FrameKind::Reset => "RESET",
        };
        f.write_str(name)
    }
}

// === impl Frame ===

impl Frame {
    fn compose(seq: u16, kind: FrameKind, payload_size: u8, payload: &[u8]) -> Frame {
        debug_assert!(payload.len() <= PAYLOAD_PER_FRAME);
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0..2].copy_from_slice(&seq.to_le_bytes());
        bytes[2] = kind as u8;
        bytes[3] = payload_size;
        bytes[METADATA_SIZE..METADATA_SIZE + payload.len()].copy_from_slice(payload);
        Frame(bytes)
    }

    /// The HEADER frame opening a message: sequence 0, carrying the message
    /// type and the number of DATA frames to follow.
    #[must_use]
    pub fn header(message_type: u8, num_packets: u16) -> Frame {
        let [lo, hi] = num_packets.to_le_bytes();
        Self::compose(
            0,
            FrameKind::Header,
            HEADER_PAYLOAD_SIZE,
            &[message_type, lo, hi, 0],
        )
    }

    /// A DATA frame. `payload` must already be chunked to at most
    /// [`PAYLOAD_PER_FRAME`] bytes; the frame is zero-padded to full size.
    #[must_use]
    pub fn data(seq: u16, payload: &[u8]) -> Frame {
        debug_assert!(!payload.is_empty());
        let payload_size = u8::try_from(payload.len().min(PAYLOAD_PER_FRAME)).unwrap_or(0);
        Self::compose(seq, FrameKind::Data, payload_size, payload)
    }

    #[must_use]
    pub fn ack(seq: u16) -> Frame {
        Self::compose(seq, FrameKind::Ack, 0, &[])
    }

    #[must_use]
    pub fn nack(seq: u16) -> Frame {
        Self::compose(seq, FrameKind::Nack, 0, &[])
    }

    #[must_use]
    pub fn reset() -> Frame {
        Self::compose(0, FrameKind::Reset, 0, &[])
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; FRAME_SIZE]) -> Frame {
        Frame(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    /// Parses the metadata header. Fails on an unknown frame type or a
    /// payload size larger than a frame can carry.
    pub fn meta(&self) -> crate::Result<Meta> {
        let seq = u16::from_le_bytes([self.0[0], self.0[1]]);
        let kind = FrameKind::try_from(self.0[2])?;
        let payload_size = self.0[3];
        if usize::from(payload_size) > PAYLOAD_PER_FRAME {
            return Err(Error::InvalidPayloadSize(payload_size));
        }
        Ok(Meta {
            seq,
            kind,
            payload_size,
        })
    }

    /// The full 60-byte payload area including padding.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.0[METADATA_SIZE..]
    }

    /// Extracts `(message_type, num_packets)` from a HEADER frame's payload.
    pub fn header_payload(&self) -> crate::Result<(u8, u16)> {
        let payload = self.payload();
        let message_type = payload[0];
        let num_packets = u16::from_le_bytes([payload[1], payload[2]]);
        Ok((message_type, num_packets))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.meta() {
            Ok(meta) => f
                .debug_struct("Frame")
                .field("seq", &meta.seq)
                .field("kind", &meta.kind)
                .field("payload_size", &meta.payload_size)
                .finish_non_exhaustive(),
            Err(_) => f.debug_struct("Frame").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn metadata_layout_is_little_endian() {
        let frame = Frame::data(0x0102, &[0xAA; 5]);
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[0..4], &[0x02, 0x01, 1, 5]);
        assert_eq!(&bytes[4..9], &[0xAA; 5]);
        assert!(bytes[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn header_carries_type_count_and_reserved_byte() {
        let frame = Frame::header(0x2A, 0x0304);
        let meta = frame.meta().unwrap();
        assert_eq!(meta.seq, 0);
        assert_eq!(meta.kind, FrameKind::Header);
        assert_eq!(meta.payload_size, 4);
        assert_eq!(frame.header_payload().unwrap(), (0x2A, 0x0304));
        assert_eq!(frame.payload()[3], 0);
    }

    #[test]
    fn control_frames_are_empty() {
        for (frame, kind) in [
            (Frame::ack(7), FrameKind::Ack),
            (Frame::nack(7), FrameKind::Nack),
            (Frame::reset(), FrameKind::Reset),
        ] {
            let meta = frame.meta().unwrap();
            assert_eq!(meta.kind, kind);
            assert_eq!(meta.payload_size, 0);
            assert!(frame.payload().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[2] = 9;
        assert!(matches!(
            Frame::from_bytes(bytes).meta(),
            Err(Error::InvalidKind(9))
        ));
    }

    #[test]
    fn oversized_payload_claim_is_rejected() {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[2] = FrameKind::Data as u8;
        bytes[3] = 61;
        assert!(matches!(
            Frame::from_bytes(bytes).meta(),
            Err(Error::InvalidPayloadSize(61))
        ));
    }

    proptest! {
        #[test]
        fn meta_round_trips(seq in any::<u16>(), kind in 0u8..=4, size in 0u8..=60) {
            let kind = FrameKind::try_from(kind).unwrap();
            let frame = Frame::compose(seq, kind, size, &[]);
            let meta = frame.meta().unwrap();
            prop_assert_eq!(meta, Meta { seq, kind, payload_size: size });
        }
    }
}
