//! Control packets exchanged with the coordinator.

use std::fmt;

/// Correlation token identifying the problem a session works on.
///
/// The value is opaque to the session; it is copied into every control
/// packet and compared against the one carried by an inbound `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemId(pub u64);

impl From<u64> for ProblemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A decoded control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Sent by the client as soon as the connection is established.
    Hello { problem_id: ProblemId },

    /// Marks the end of the session. Received from the coordinator when the
    /// problem is finished, sent by the client right before it goes away.
    Done { problem_id: ProblemId },
}

impl Packet {
    /// Returns the problem id carried by the packet.
    pub fn problem_id(&self) -> ProblemId {
        match self {
            Packet::Hello { problem_id } | Packet::Done { problem_id } => *problem_id,
        }
    }
}
