use crate::error::is_transient;
use crate::sys::platform::MAX_IOV;

use bytes::Bytes;
use std::collections::VecDeque;
use std::io::{self, IoSlice, Write};

/// FIFO of encoded packets waiting to be written.
///
/// Packets are written in the order they were pushed. A flush may stop in
/// the middle of a packet; the written prefix is remembered and the next
/// flush resumes right after it.
#[derive(Debug, Default)]
pub struct WriteQueue {
    packets: VecDeque<Bytes>,

    /// Bytes of the head packet already written.
    offset: usize,
}

impl WriteQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded packet at the tail.
    pub fn push(&mut self, packet: Bytes) {
        self.packets.push_back(packet);
    }

    /// Returns `true` if no bytes remain queued.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Number of packets not yet fully written.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Number of bytes not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.packets.iter().map(Bytes::len).sum::<usize>() - self.offset
    }

    /// Performs one write of as much queued data as `writer` accepts.
    ///
    /// Fully written packets are removed from the queue. Returns the number
    /// of bytes written, which is `0` when the writer would block.
    pub fn flush<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.packets.is_empty() {
            return Ok(0);
        }

        let mut slices = [IoSlice::new(&[]); MAX_IOV];
        let mut count = 0;

        for (i, packet) in self.packets.iter().take(MAX_IOV).enumerate() {
            let bytes = if i == 0 {
                &packet[self.offset..]
            } else {
                &packet[..]
            };

            slices[count] = IoSlice::new(bytes);
            count += 1;
        }

        match writer.write_vectored(&slices[..count]) {
            Ok(n) => {
                self.consume(n);
                Ok(n)
            }
            Err(e) if is_transient(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn consume(&mut self, mut n: usize) {
        while let Some(head) = self.packets.front() {
            let left = head.len() - self.offset;

            if n < left {
                self.offset += n;
                return;
            }

            n -= left;
            self.offset = 0;
            self.packets.pop_front();
        }
    }
}
