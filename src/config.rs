use crate::codec::{DEFAULT_MAX_PACKET_SIZE, HEADER_SIZE, PacketCodec, WireCodec};
use crate::connection::ConnectionManager;
use crate::packet::ProblemId;

/// Default initial capacity of the reassembly buffer.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 4096;

/// Builder for configuring and creating a [`ConnectionManager`].
///
/// # Examples
///
/// ```rust,ignore
/// let conn = ConnectionBuilder::new(ProblemId(7))
///     .read_buffer_capacity(64 * 1024)
///     .max_packet_size(1024 * 1024)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    problem_id: ProblemId,

    /// Initial size of the reassembly buffer. It grows on demand.
    read_buffer_capacity: usize,

    /// Largest inbound packet accepted by the default codec.
    max_packet_size: usize,
}

impl ConnectionBuilder {
    /// Creates a builder with default settings for `problem_id`.
    pub fn new(problem_id: ProblemId) -> Self {
        Self {
            problem_id,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Sets the initial capacity of the reassembly buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot hold a packet header.
    pub fn read_buffer_capacity(mut self, capacity: usize) -> Self {
        assert!(
            capacity >= HEADER_SIZE,
            "read_buffer_capacity must hold at least a header"
        );

        self.read_buffer_capacity = capacity;
        self
    }

    /// Sets the largest inbound packet accepted by [`WireCodec`].
    ///
    /// # Panics
    ///
    /// Panics if `size` cannot hold a packet header.
    pub fn max_packet_size(mut self, size: usize) -> Self {
        assert!(
            size >= HEADER_SIZE,
            "max_packet_size must hold at least a header"
        );

        self.max_packet_size = size;
        self
    }

    /// Builds a disconnected session using [`WireCodec`].
    pub fn build(self) -> ConnectionManager<WireCodec> {
        let codec = WireCodec::with_max_packet_size(self.max_packet_size);
        self.build_with_codec(codec)
    }

    /// Builds a disconnected session using a custom codec.
    ///
    /// The maximum packet size setting only applies to [`WireCodec`].
    pub fn build_with_codec<C: PacketCodec>(self, codec: C) -> ConnectionManager<C> {
        ConnectionManager::with_codec(self.problem_id, codec, self.read_buffer_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;

    #[test]
    fn test_builder_defaults() {
        let conn = ConnectionBuilder::new(ProblemId(9)).build();

        assert_eq!(conn.problem_id(), ProblemId(9));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_done());
        assert_eq!(conn.pending_writes(), 0);
    }

    #[test]
    #[should_panic(expected = "read_buffer_capacity must hold at least a header")]
    fn test_builder_rejects_tiny_buffer() {
        let _ = ConnectionBuilder::new(ProblemId(1)).read_buffer_capacity(4);
    }

    #[test]
    #[should_panic(expected = "max_packet_size must hold at least a header")]
    fn test_builder_rejects_tiny_packets() {
        let _ = ConnectionBuilder::new(ProblemId(1)).max_packet_size(0);
    }
}
