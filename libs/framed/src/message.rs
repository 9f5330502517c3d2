// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::frame::{Frame, PAYLOAD_PER_FRAME};
use crate::Error;

/// Largest number of DATA frames a single message may occupy.
pub const MAX_PACKETS: usize = 0xFFFF;

/// A logical payload for the framed link.
///
/// The data is kept unpadded; padding is applied per-frame on the way out
/// and the final DATA frame's `payload_size` tells the receiver how many
/// bytes of it are real.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    message_type: u8,
    data: Vec<u8>,
}

// === impl Message ===

impl Message {
    pub fn new(message_type: u8, data: Vec<u8>) -> crate::Result<Message> {
        if data.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let packets = data.len().div_ceil(PAYLOAD_PER_FRAME);
        if packets > MAX_PACKETS {
            return Err(Error::MessageTooLarge(packets));
        }
        Ok(Self { message_type, data })
    }

    #[must_use]
    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Constructively never true, `new` rejects empty data.
        self.data.is_empty()
    }

    /// Number of DATA frames this message occupies.
    #[must_use]
    pub fn num_packets(&self) -> u16 {
        u16::try_from(self.data.len().div_ceil(PAYLOAD_PER_FRAME)).unwrap_or(u16::MAX)
    }

    /// The HEADER frame announcing this message.
    #[must_use]
    pub fn header_frame(&self) -> Frame {
        Frame::header(self.message_type, self.num_packets())
    }

    /// The DATA frame with sequence number `seq`, in `1..=num_packets`.
    pub fn data_frame(&self, seq: u16) -> crate::Result<Frame> {
        if seq == 0 || seq > self.num_packets() {
            return Err(Error::SeqOutOfRange(seq));
        }
        let start = (usize::from(seq) - 1) * PAYLOAD_PER_FRAME;
        let end = (start + PAYLOAD_PER_FRAME).min(self.data.len());
        Ok(Frame::data(seq, &self.data[start..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameKind;
    use proptest::prelude::*;

    #[test]
    fn empty_data_is_rejected() {
        assert!(matches!(Message::new(1, Vec::new()), Err(Error::EmptyMessage)));
    }

    #[test]
    fn oversized_data_is_rejected() {
        let data = vec![0u8; (MAX_PACKETS + 1) * PAYLOAD_PER_FRAME];
        assert!(matches!(Message::new(1, data), Err(Error::MessageTooLarge(_))));
    }

    #[test]
    fn exactly_one_payload_is_one_full_packet() {
        let message = Message::new(1, vec![0xAB; PAYLOAD_PER_FRAME]).unwrap();
        assert_eq!(message.num_packets(), 1);
        let frame = message.data_frame(1).unwrap();
        let meta = frame.meta().unwrap();
        assert_eq!(meta.payload_size, 60);
        assert_eq!(frame.payload(), &[0xAB; 60]);
    }

    #[test]
    fn trailing_packet_reports_true_byte_count() {
        let message = Message::new(1, vec![7u8; 100]).unwrap();
        assert_eq!(message.num_packets(), 2);
        assert_eq!(message.data_frame(1).unwrap().meta().unwrap().payload_size, 60);
        let last = message.data_frame(2).unwrap();
        let meta = last.meta().unwrap();
        assert_eq!(meta.payload_size, 40);
        // Pad bytes beyond payload_size are zero.
        assert!(last.payload()[40..].iter().all(|&b| b == 0));
    }

    #[test]
    fn data_frame_seq_bounds() {
        let message = Message::new(1, vec![0u8; 10]).unwrap();
        assert!(matches!(message.data_frame(0), Err(Error::SeqOutOfRange(0))));
        assert!(matches!(message.data_frame(2), Err(Error::SeqOutOfRange(2))));
    }

    proptest! {
        #[test]
        fn chunks_reassemble_to_the_original_data(data in proptest::collection::vec(any::<u8>(), 1..2048)) {
            let message = Message::new(0x01, data.clone()).unwrap();
            let header = message.header_frame().meta().unwrap();
            prop_assert_eq!(header.kind, FrameKind::Header);
            prop_assert_eq!(usize::from(message.num_packets()), data.len().div_ceil(PAYLOAD_PER_FRAME));

            let mut reassembled = Vec::new();
            for seq in 1..=message.num_packets() {
                let frame = message.data_frame(seq).unwrap();
                let meta = frame.meta().unwrap();
                reassembled.extend_from_slice(&frame.payload()[..usize::from(meta.payload_size)]);
            }
            prop_assert_eq!(reassembled, data);
        }
    }
}
