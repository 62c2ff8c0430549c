//! Operating system bindings.
//!
//! Thin wrappers over the socket system calls used by the session:
//! socket creation, non-blocking mode, connect, send/recv and a
//! zero-timeout readiness check. Every wrapper maps a negative return
//! code to [`std::io::Error::last_os_error`].
//!
//! Only unix targets are supported.

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
