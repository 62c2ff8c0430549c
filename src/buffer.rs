use bytes::Buf;

/// Reassembly buffer for a byte stream.
///
/// The buffer alternates between two modes:
///
/// - **append mode**: received bytes are written after the tail, either by
///   copying ([`append`](Self::append)) or by receiving straight into
///   [`spare_mut`](Self::spare_mut) and then calling [`commit`](Self::commit);
/// - **read mode**: entered with [`flip`](Self::flip), the unconsumed bytes
///   are exposed through [`bytes::Buf`] for the packet codec to consume.
///
/// [`compact`](Self::compact) returns to append mode. Unconsumed bytes are
/// always one contiguous region, moved byte-for-byte to the start of the
/// storage on every compaction.
#[derive(Debug)]
pub struct ReadBuffer {
    /// Backing storage. Its length is the buffer capacity.
    data: Vec<u8>,

    /// Index of the first unconsumed byte.
    head: usize,

    /// Index one past the last received byte.
    tail: usize,

    /// `true` between `flip` and `compact`.
    reading: bool,
}

impl ReadBuffer {
    /// Creates an empty buffer in append mode.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            head: 0,
            tail: 0,
            reading: false,
        }
    }

    /// Total number of bytes the buffer can hold without growing.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Free space after the tail.
    pub fn spare_capacity(&self) -> usize {
        self.data.len() - self.tail
    }

    /// Returns the writable region after the tail.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        debug_assert!(!self.reading, "spare_mut called in read mode");
        &mut self.data[self.tail..]
    }

    /// Marks `n` bytes written into [`spare_mut`](Self::spare_mut) as received.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the spare capacity.
    pub fn commit(&mut self, n: usize) {
        assert!(n <= self.spare_capacity(), "commit past end of buffer");
        self.tail += n;
    }

    /// Copies `bytes` after the tail, growing the storage if needed.
    pub fn append(&mut self, bytes: &[u8]) {
        debug_assert!(!self.reading, "append called in read mode");

        if bytes.len() > self.spare_capacity() {
            self.grow(self.tail + bytes.len());
        }

        self.data[self.tail..self.tail + bytes.len()].copy_from_slice(bytes);
        self.tail += bytes.len();
    }

    /// Switches to read mode.
    ///
    /// Everything received and not yet consumed, the remainder of the
    /// previous round included, becomes readable through [`Buf`].
    pub fn flip(&mut self) {
        self.reading = true;
    }

    /// Discards consumed bytes and switches back to append mode.
    ///
    /// The unconsumed bytes move to the start of the storage. If fewer than
    /// `needed` bytes of spare capacity remain afterwards, the storage grows
    /// so the next packet fits.
    pub fn compact(&mut self, needed: usize) {
        if self.head > 0 {
            self.data.copy_within(self.head..self.tail, 0);
            self.tail -= self.head;
            self.head = 0;
        }

        self.reading = false;

        if self.spare_capacity() < needed {
            self.grow(self.tail + needed);
        }
    }

    /// Drops every buffered byte and returns to append mode.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.reading = false;
    }

    /// Returns the unconsumed bytes.
    pub fn unconsumed(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    /// Returns `true` while in read mode.
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    fn grow(&mut self, min_capacity: usize) {
        let capacity = min_capacity.max(self.data.len() * 2);
        self.data.resize(capacity, 0);
    }
}

impl Buf for ReadBuffer {
    fn remaining(&self) -> usize {
        self.tail - self.head
    }

    fn chunk(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "cannot advance past the received bytes"
        );
        self.head += cnt;
    }
}
