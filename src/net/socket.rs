use crate::sys::platform::{
    sys_close, sys_connect, sys_poll_writable, sys_recv, sys_send, sys_send_vectored,
    sys_set_nonblocking, sys_socket, sys_take_socket_error,
};

use std::io::{self, IoSlice, Write};
use std::mem;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

/// An owned stream socket.
///
/// The descriptor is closed exactly once, either explicitly through
/// [`close`](Self::close) or when the value is dropped.
#[derive(Debug)]
pub(crate) struct Socket {
    fd: RawFd,
}

impl Socket {
    /// Creates a non-blocking stream socket suitable for `addr`.
    pub(crate) fn open(addr: &SocketAddr) -> io::Result<Self> {
        sys_socket(addr).map(|fd| Self { fd })
    }

    /// Starts connecting to `addr`.
    ///
    /// A non-blocking socket normally returns `EINPROGRESS` here.
    pub(crate) fn connect(&self, addr: &SocketAddr) -> io::Result<()> {
        sys_connect(self.fd, addr)
    }

    /// Returns the `poll` events currently pending for writing, without waiting.
    pub(crate) fn poll_writable(&self) -> io::Result<i16> {
        sys_poll_writable(self.fd)
    }

    /// Returns the error left by an asynchronous connect, if any.
    pub(crate) fn take_error(&self) -> io::Result<()> {
        sys_take_socket_error(self.fd)
    }

    /// Switches the socket between blocking and non-blocking mode.
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        sys_set_nonblocking(self.fd, nonblocking)
    }

    /// Receives into `buffer`. `Ok(0)` means the peer closed the stream.
    pub(crate) fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        sys_recv(self.fd, buffer)
    }

    /// Closes the descriptor, reporting any error from `close(2)`.
    pub(crate) fn close(self) -> io::Result<()> {
        let fd = self.fd;
        mem::forget(self);
        sys_close(fd)
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        sys_send(self.fd, buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        sys_send_vectored(self.fd, bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(e) = sys_close(self.fd) {
            tracing::warn!(fd = self.fd, error = %e, "error closing socket");
        }
    }
}
