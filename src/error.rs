//! Error types for the coordinator session.

use std::io;
use thiserror::Error;

/// Result type alias using [`CommError`].
pub type Result<T> = std::result::Result<T, CommError>;

/// Errors surfaced by [`ConnectionManager`](crate::ConnectionManager).
///
/// Connection failures on individual candidate addresses are not part of
/// this type: they are logged and the next candidate is tried.
#[derive(Debug, Error)]
pub enum CommError {
    /// Host/port lookup failed, or produced no usable address.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolution {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The stream could not be read; the session is over.
    #[error("recv failed: {0}")]
    Receive(#[source] io::Error),

    /// The stream could not be written; the session is over.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// A socket option could not be applied.
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),

    /// The peer sent bytes that do not form a valid packet.
    #[error("malformed packet: {0}")]
    Codec(#[from] CodecError),

    /// The operation needs an open socket.
    #[error("not connected")]
    NotConnected,
}

/// Errors reported by a [`PacketCodec`](crate::codec::PacketCodec).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The header carries a type this codec does not know.
    #[error("unknown packet type {0:#010x}")]
    UnknownType(u32),

    /// The header size is inconsistent with the packet type.
    #[error("bad size {size} for packet type {kind:#010x}")]
    BadSize { kind: u32, size: usize },

    /// The header announces a packet above the configured maximum.
    #[error("packet of {size} bytes exceeds the maximum of {max}")]
    TooLarge { size: usize, max: usize },

    /// The codec reported a decoded packet without consuming any input.
    #[error("codec reported a packet without consuming input")]
    Stalled,
}

/// Returns `true` for error kinds that only mean "try again later".
///
/// Would-block and interrupted calls are an expected part of non-blocking
/// I/O and are never surfaced as errors.
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
