use crate::error::{CommError, Result};

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Candidate endpoints for one connect session, in resolver order.
///
/// The cursor only moves forward: once a candidate has been given up on it
/// is never tried again within the same session.
#[derive(Debug, Clone)]
pub struct AddressList {
    addrs: Vec<SocketAddr>,
    cursor: usize,
}

impl AddressList {
    /// Resolves `host` and `port` into stream endpoints.
    ///
    /// `host` may be a literal IPv4/IPv6 address or a name. A lookup that
    /// fails, or that yields no address, is a [`CommError::Resolution`].
    pub fn resolve(host: &str, port: u16) -> Result<Self> {
        let resolution = |source: io::Error| CommError::Resolution {
            host: host.to_owned(),
            port,
            source,
        };

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(resolution)?
            .collect();

        if addrs.is_empty() {
            return Err(resolution(io::Error::new(
                io::ErrorKind::NotFound,
                "no addresses found",
            )));
        }

        Ok(Self { addrs, cursor: 0 })
    }

    /// Wraps an already resolved list of endpoints.
    pub fn from_addrs<I: IntoIterator<Item = SocketAddr>>(addrs: I) -> Self {
        Self {
            addrs: addrs.into_iter().collect(),
            cursor: 0,
        }
    }

    /// The candidate under the cursor, or `None` once the list is exhausted.
    pub fn current(&self) -> Option<SocketAddr> {
        self.addrs.get(self.cursor).copied()
    }

    /// Gives up on the current candidate.
    pub fn advance(&mut self) {
        if self.cursor < self.addrs.len() {
            self.cursor += 1;
        }
    }

    /// Number of candidates given up on so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.addrs.len()
    }
}
