//! Stream networking primitives.
//!
//! - [`resolver`]: turns a host and port into an ordered list of
//!   candidate endpoints,
//! - [`socket`]: an owned, non-blocking stream socket.

pub mod resolver;
pub(crate) mod socket;

pub use resolver::AddressList;
