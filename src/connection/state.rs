use std::fmt;

/// Lifecycle state of a [`ConnectionManager`](super::ConnectionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket is open.
    Disconnected,

    /// A non-blocking connect is in flight on the current candidate.
    Connecting,

    /// The stream is established and stepped by `process`.
    Connected,

    /// `send_done` switched the socket to blocking mode to flush the final
    /// packets. The session does not return to `Connected` from here.
    Draining,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Draining => "draining",
        };

        f.write_str(name)
    }
}
