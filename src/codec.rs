//! Packet framing.
//!
//! A [`PacketCodec`] turns the bytes collected in a [`ReadBuffer`] into
//! [`Packet`]s and encodes outbound packets. [`drain`] runs a codec over a
//! buffer and yields every complete packet it holds.
//!
//! The bundled [`WireCodec`] frames every packet with an eight byte header:
//!
//! ```text
//! +----------------+----------------+---------------------+
//! | type (u32, BE) | size (u32, BE) | payload             |
//! +----------------+----------------+---------------------+
//! ```
//!
//! `size` counts the whole packet, header included. Both control packets
//! carry the problem id as a big-endian `u64` payload.

use crate::buffer::ReadBuffer;
use crate::error::CodecError;
use crate::packet::{Packet, ProblemId};

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the packet header.
pub const HEADER_SIZE: usize = 8;

/// Type tag of a `Hello` packet.
pub const HELLO_TYPE: u32 = 0x3864_caca;

/// Type tag of a `Done` packet.
pub const DONE_TYPE: u32 = 0x3864_d00e;

/// Default upper bound on the size of a single packet.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Size of both control packets on the wire.
const CONTROL_SIZE: usize = HEADER_SIZE + 8;

/// Outcome of a single [`PacketCodec::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    /// One complete packet was consumed from the buffer. More may follow.
    Packet(Packet),

    /// The next packet is incomplete; this many more bytes are required.
    /// Nothing was consumed. The count is always positive.
    Needed(usize),
}

/// Encodes and decodes packets.
pub trait PacketCodec {
    /// Decodes at most one packet from the readable region of `buffer`.
    fn parse(&mut self, buffer: &mut ReadBuffer) -> Result<Parsed, CodecError>;

    /// Encodes `packet` into its wire representation.
    fn encode(&self, packet: &Packet) -> Bytes;
}

/// The coordinator's framing.
#[derive(Debug, Clone)]
pub struct WireCodec {
    max_packet_size: usize,
}

impl WireCodec {
    /// Creates a codec accepting packets up to [`DEFAULT_MAX_PACKET_SIZE`].
    pub fn new() -> Self {
        Self::with_max_packet_size(DEFAULT_MAX_PACKET_SIZE)
    }

    /// Creates a codec rejecting packets larger than `max_packet_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_packet_size` cannot hold a header.
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        assert!(
            max_packet_size >= HEADER_SIZE,
            "max_packet_size must hold at least a header"
        );

        Self { max_packet_size }
    }

    /// Returns the largest packet this codec accepts.
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCodec for WireCodec {
    fn parse(&mut self, buffer: &mut ReadBuffer) -> Result<Parsed, CodecError> {
        let available = buffer.remaining();
        if available < HEADER_SIZE {
            return Ok(Parsed::Needed(HEADER_SIZE - available));
        }

        let mut header = &buffer.chunk()[..HEADER_SIZE];
        let kind = header.get_u32();
        let size = header.get_u32() as usize;

        if kind != HELLO_TYPE && kind != DONE_TYPE {
            return Err(CodecError::UnknownType(kind));
        }

        if size > self.max_packet_size {
            return Err(CodecError::TooLarge {
                size,
                max: self.max_packet_size,
            });
        }

        if size != CONTROL_SIZE {
            return Err(CodecError::BadSize { kind, size });
        }

        if available < size {
            return Ok(Parsed::Needed(size - available));
        }

        buffer.advance(HEADER_SIZE);
        let problem_id = ProblemId(buffer.get_u64());

        let packet = if kind == HELLO_TYPE {
            Packet::Hello { problem_id }
        } else {
            Packet::Done { problem_id }
        };

        Ok(Parsed::Packet(packet))
    }

    fn encode(&self, packet: &Packet) -> Bytes {
        let kind = match packet {
            Packet::Hello { .. } => HELLO_TYPE,
            Packet::Done { .. } => DONE_TYPE,
        };

        let mut out = BytesMut::with_capacity(CONTROL_SIZE);
        out.put_u32(kind);
        out.put_u32(CONTROL_SIZE as u32);
        out.put_u64(packet.problem_id().0);

        out.freeze()
    }
}

/// Runs `codec` over the readable region of `buffer`.
///
/// `buffer` must be in read mode (see [`ReadBuffer::flip`]).
pub fn drain<'a, C: PacketCodec>(codec: &'a mut C, buffer: &'a mut ReadBuffer) -> Drain<'a, C> {
    debug_assert!(buffer.is_reading(), "drain called in append mode");

    Drain {
        codec,
        buffer,
        needed: None,
        finished: false,
    }
}

/// Iterator over the complete packets held by a [`ReadBuffer`].
///
/// Yields packets until the codec reports a positive needed-byte count,
/// which is then available from [`needed`](Self::needed). The sequence is
/// always finite: a codec that reports a packet without consuming input,
/// or a zero byte count, ends it with [`CodecError::Stalled`].
pub struct Drain<'a, C> {
    codec: &'a mut C,
    buffer: &'a mut ReadBuffer,
    needed: Option<usize>,
    finished: bool,
}

impl<C> Drain<'_, C> {
    /// Bytes the next packet still needs, once the iterator is exhausted.
    pub fn needed(&self) -> Option<usize> {
        self.needed
    }
}

impl<C: PacketCodec> Iterator for Drain<'_, C> {
    type Item = Result<Packet, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let before = self.buffer.remaining();

        let result = match self.codec.parse(self.buffer) {
            Ok(Parsed::Packet(packet)) if self.buffer.remaining() < before => Ok(packet),
            Ok(Parsed::Needed(n)) if n > 0 => {
                self.needed = Some(n);
                self.finished = true;
                return None;
            }
            Ok(_) => Err(CodecError::Stalled),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.finished = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readable(bytes: &[u8]) -> ReadBuffer {
        let mut buffer = ReadBuffer::with_capacity(64);
        buffer.append(bytes);
        buffer.flip();
        buffer
    }

    #[test]
    fn test_hello_round_trip() {
        let mut codec = WireCodec::new();
        let hello = Packet::Hello {
            problem_id: ProblemId(0xdead_beef_0042),
        };

        let mut buffer = readable(&codec.encode(&hello));

        assert_eq!(codec.parse(&mut buffer), Ok(Parsed::Packet(hello)));
        assert!(!buffer.has_remaining());
    }

    #[test]
    fn test_done_round_trip() {
        let mut codec = WireCodec::new();
        let done = Packet::Done {
            problem_id: ProblemId(7),
        };

        let mut buffer = readable(&codec.encode(&done));

        match codec.parse(&mut buffer) {
            Ok(Parsed::Packet(packet)) => assert_eq!(packet.problem_id(), ProblemId(7)),
            other => panic!("unexpected parse result: {other:?}"),
        }
    }

    #[test]
    fn test_encoded_layout() {
        let codec = WireCodec::new();
        let bytes = codec.encode(&Packet::Done {
            problem_id: ProblemId(1),
        });

        assert_eq!(
            &bytes[..],
            &[0x38, 0x64, 0xd0, 0x0e, 0, 0, 0, 16, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_empty_buffer_needs_header() {
        let mut codec = WireCodec::new();
        let mut buffer = readable(&[]);

        assert_eq!(codec.parse(&mut buffer), Ok(Parsed::Needed(HEADER_SIZE)));
    }

    #[test]
    fn test_partial_payload_reports_missing_bytes() {
        let mut codec = WireCodec::new();
        let bytes = codec.encode(&Packet::Hello {
            problem_id: ProblemId(3),
        });

        let mut buffer = readable(&bytes[..11]);

        assert_eq!(codec.parse(&mut buffer), Ok(Parsed::Needed(5)));
        assert_eq!(buffer.remaining(), 11, "nothing may be consumed");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut codec = WireCodec::new();
        let mut buffer = readable(&[0, 0, 0, 9, 0, 0, 0, 16]);

        assert_eq!(codec.parse(&mut buffer), Err(CodecError::UnknownType(9)));
    }

    #[test]
    fn test_oversized_packet_is_rejected() {
        let mut codec = WireCodec::with_max_packet_size(12);
        let bytes = codec.encode(&Packet::Hello {
            problem_id: ProblemId(3),
        });

        let mut buffer = readable(&bytes);

        assert_eq!(
            codec.parse(&mut buffer),
            Err(CodecError::TooLarge { size: 16, max: 12 })
        );
    }

    #[test]
    fn test_bad_size_is_rejected() {
        let mut codec = WireCodec::new();
        let mut buffer = readable(&[0x38, 0x64, 0xca, 0xca, 0, 0, 0, 12]);

        assert_eq!(
            codec.parse(&mut buffer),
            Err(CodecError::BadSize {
                kind: HELLO_TYPE,
                size: 12
            })
        );
    }

    #[test]
    fn test_drain_yields_all_complete_packets() {
        let mut codec = WireCodec::new();
        let mut bytes = Vec::new();
        for id in 1..=3 {
            bytes.extend_from_slice(&codec.encode(&Packet::Done {
                problem_id: ProblemId(id),
            }));
        }
        bytes.extend_from_slice(&[0x38, 0x64]);

        let mut buffer = readable(&bytes);
        let mut drained = drain(&mut codec, &mut buffer);

        let ids: Vec<u64> = drained
            .by_ref()
            .map(|p| p.map(|p| p.problem_id().0))
            .collect::<Result<_, _>>()
            .expect("all packets are valid");

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(drained.needed(), Some(HEADER_SIZE - 2));
    }

    struct StuckCodec;

    impl PacketCodec for StuckCodec {
        fn parse(&mut self, _: &mut ReadBuffer) -> Result<Parsed, CodecError> {
            Ok(Parsed::Packet(Packet::Hello {
                problem_id: ProblemId(0),
            }))
        }

        fn encode(&self, _: &Packet) -> Bytes {
            Bytes::new()
        }
    }

    #[test]
    fn test_drain_stops_on_codec_without_progress() {
        let mut codec = StuckCodec;
        let mut buffer = readable(b"xyz");

        let results: Vec<_> = drain(&mut codec, &mut buffer).collect();

        assert_eq!(results, vec![Err(CodecError::Stalled)]);
    }
}
