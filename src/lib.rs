//! # coordlink
//!
//! **coordlink** is the client side of a coordinator session: it opens an
//! outbound stream connection, drives it through a non-blocking lifecycle,
//! exchanges the `Hello`/`Done` control handshake and reassembles packets
//! from the raw byte stream.
//!
//! There is no runtime, thread or timer inside. The owner calls
//! [`ConnectionManager::process`] from its own loop and every call performs
//! one bounded, non-blocking step:
//!
//! - **Connection fallback**: every resolved address is tried in order until
//!   one accepts the connection,
//! - **Readiness polling**: a pending connect is checked with a zero-timeout
//!   `poll`,
//! - **Buffered I/O**: partial writes resume where they stopped, partial
//!   packets wait in the reassembly buffer for the rest of their bytes,
//! - **Graceful shutdown**: [`ConnectionManager::send_done`] blocks until the
//!   final `Done` has been written.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coordlink::{ConnectionManager, ProblemId};
//!
//! let mut conn = ConnectionManager::new(ProblemId(42));
//! conn.connect("127.0.0.1", 3272)?;
//!
//! while !conn.is_done() {
//!     conn.process()?;
//! }
//!
//! conn.send_done()?;
//! ```
//!
//! ## Modules
//!
//! - [`buffer`] — the stream reassembly buffer
//! - [`codec`] — packet framing and the drain loop
//! - [`net`] — address resolution
//! - [`queue`] — the outbound write queue

mod config;
mod connection;
mod error;
mod packet;
mod sys;

pub mod buffer;
pub mod codec;
pub mod net;
pub mod queue;

pub use config::{ConnectionBuilder, DEFAULT_READ_BUFFER_CAPACITY};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{CodecError, CommError, Result};
pub use packet::{Packet, ProblemId};
