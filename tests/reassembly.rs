use coordlink::buffer::ReadBuffer;
use coordlink::codec::{PacketCodec, WireCodec, drain};
use coordlink::{Packet, ProblemId};

/// Feeds `chunks` through the buffer the way the session does after every
/// receive, checking that compaction keeps the unconsumed bytes intact.
fn feed(chunks: &[&[u8]], capacity: usize) -> (Vec<Packet>, ReadBuffer) {
    let mut codec = WireCodec::new();
    let mut buffer = ReadBuffer::with_capacity(capacity);
    let mut delivered = Vec::new();

    for chunk in chunks {
        buffer.append(chunk);
        buffer.flip();

        let mut packets = drain(&mut codec, &mut buffer);
        for packet in packets.by_ref() {
            delivered.push(packet.expect("stream is well formed"));
        }
        let needed = packets.needed().expect("drain ends with a byte count");

        let suffix = buffer.unconsumed().to_vec();
        buffer.compact(needed);

        assert_eq!(buffer.unconsumed(), &suffix[..], "compaction changed bytes");
        assert!(buffer.spare_capacity() >= needed);
    }

    (delivered, buffer)
}

#[test]
fn test_single_packet_every_split_point() {
    let packet = Packet::Done {
        problem_id: ProblemId(0x0102_0304_0506_0708),
    };
    let bytes = WireCodec::new().encode(&packet);

    for split in 0..=bytes.len() {
        let (delivered, buffer) = feed(&[&bytes[..split], &bytes[split..]], 8);

        assert_eq!(delivered, vec![packet], "split at {split}");
        assert!(buffer.unconsumed().is_empty(), "split at {split}");
    }
}

#[test]
fn test_back_to_back_packets_every_split_point() {
    let codec = WireCodec::new();
    let first = Packet::Hello {
        problem_id: ProblemId(1),
    };
    let second = Packet::Done {
        problem_id: ProblemId(2),
    };

    let mut bytes = codec.encode(&first).to_vec();
    bytes.extend_from_slice(&codec.encode(&second));

    for split in 0..=bytes.len() {
        let (delivered, buffer) = feed(&[&bytes[..split], &bytes[split..]], 16);

        assert_eq!(delivered, vec![first, second], "split at {split}");
        assert!(buffer.unconsumed().is_empty(), "split at {split}");
    }
}

#[test]
fn test_byte_at_a_time() {
    let packet = Packet::Hello {
        problem_id: ProblemId(99),
    };
    let bytes = WireCodec::new().encode(&packet);
    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();

    let (delivered, _) = feed(&chunks, 8);

    assert_eq!(delivered, vec![packet]);
}
