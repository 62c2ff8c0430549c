//! The coordinator session state machine.
//!
//! A [`ConnectionManager`] owns every resource of one client session: the
//! socket, the candidate address list, the reassembly buffer and the write
//! queue. It never runs on its own. The owner calls
//! [`process`](ConnectionManager::process) repeatedly, and each call performs
//! one bounded, non-blocking step:
//!
//! - `Connecting`: a zero-timeout readiness check on the pending connect,
//! - `Connected`: one flush of the write queue, one `recv`, and dispatch of
//!   every complete packet received so far.
//!
//! The only blocking path is [`send_done`](ConnectionManager::send_done),
//! which flushes the final packets before the owner goes away.
//!
//! A connect that never completes leaves the session in `Connecting`
//! indefinitely; no timeout is applied here.

mod state;

pub use state::ConnectionState;

use crate::buffer::ReadBuffer;
use crate::codec::{PacketCodec, WireCodec, drain};
use crate::config::ConnectionBuilder;
use crate::error::{CodecError, CommError, Result, is_transient};
use crate::net::AddressList;
use crate::net::socket::Socket;
use crate::packet::{Packet, ProblemId};
use crate::queue::WriteQueue;

use libc::{EINPROGRESS, EINTR, POLLERR, POLLHUP, POLLOUT};
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use tracing::{debug, error, info, trace, warn};

/// A client session with the coordinator.
///
/// # Examples
///
/// ```rust,ignore
/// let mut conn = ConnectionManager::new(ProblemId(42));
/// conn.connect("coordinator.local", 3272)?;
///
/// while !conn.is_done() {
///     conn.process()?;
///     // ... do other work ...
/// }
///
/// conn.send_done()?;
/// ```
#[derive(Debug)]
pub struct ConnectionManager<C = WireCodec> {
    problem_id: ProblemId,
    state: ConnectionState,

    /// `None` while no socket is open.
    socket: Option<Socket>,

    /// Candidates of the current connect session.
    addrs: Option<AddressList>,

    /// Candidates tried in the current connect session.
    attempts: usize,

    read_buffer: ReadBuffer,
    write_queue: WriteQueue,
    codec: C,

    /// Set once the peer sends `Done`. Never cleared.
    done: bool,
}

impl ConnectionManager<WireCodec> {
    /// Creates a disconnected session for `problem_id` with default settings.
    pub fn new(problem_id: ProblemId) -> Self {
        ConnectionBuilder::new(problem_id).build()
    }
}

impl<C: PacketCodec> ConnectionManager<C> {
    pub(crate) fn with_codec(
        problem_id: ProblemId,
        codec: C,
        read_buffer_capacity: usize,
    ) -> Self {
        Self {
            problem_id,
            state: ConnectionState::Disconnected,
            socket: None,
            addrs: None,
            attempts: 0,
            read_buffer: ReadBuffer::with_capacity(read_buffer_capacity),
            write_queue: WriteQueue::new(),
            codec,
            done: false,
        }
    }

    /// Resolves `host` and starts connecting to the first reachable address.
    ///
    /// Any open socket is closed first and the previous address list is
    /// discarded. Addresses are tried one at a time in resolver order; the
    /// outcome is visible through [`state`](Self::state), and a pending
    /// connect is completed by later [`process`](Self::process) calls.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::Resolution`] if the lookup fails. The session is
    /// left untouched in that case.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        info!(host, port, "connecting");

        let addrs = AddressList::resolve(host, port)?;
        self.connect_to(addrs);

        Ok(())
    }

    /// Starts connecting to an already resolved list of candidates.
    pub fn connect_to(&mut self, addrs: AddressList) {
        self.close();

        if addrs.is_empty() {
            warn!("connecting with an empty candidate list");
        }

        self.addrs = Some(addrs);
        self.attempts = 0;
        self.read_buffer.clear();

        self.try_connect();
    }

    /// Performs one non-blocking step of the session.
    ///
    /// Does nothing while disconnected or draining.
    ///
    /// # Errors
    ///
    /// A failed `recv` or `send`, or a malformed inbound packet, ends the
    /// session: the socket is closed, the state becomes `Disconnected`
    /// and the error is returned. The session is not re-established
    /// automatically; call [`connect`](Self::connect) again for that.
    ///
    /// Would-block and interrupted calls are not errors.
    pub fn process(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Draining => Ok(()),
            ConnectionState::Connecting => {
                if self.poll_connect() {
                    self.step_connected()
                } else {
                    Ok(())
                }
            }
            ConnectionState::Connected => self.step_connected(),
        }
    }

    /// Sends `Done` and blocks until it and everything queued before it has
    /// been written.
    ///
    /// The socket is switched to blocking mode and the session enters
    /// [`ConnectionState::Draining`]; it is meant to be the last call before
    /// the session is closed or dropped.
    ///
    /// # Errors
    ///
    /// [`CommError::NotConnected`] unless the session is `Connected`,
    /// [`CommError::Socket`] if blocking mode cannot be set and
    /// [`CommError::Send`] if the final write fails. Both of the latter
    /// close the socket and leave the session `Disconnected`.
    pub fn send_done(&mut self) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(CommError::NotConnected);
        }

        let Some(socket) = self.socket.as_mut() else {
            return Err(CommError::NotConnected);
        };

        self.state = ConnectionState::Draining;
        if let Err(e) = socket.set_nonblocking(false) {
            return Err(self.fail(CommError::Socket(e)));
        }

        let done = self.codec.encode(&Packet::Done {
            problem_id: self.problem_id,
        });
        self.write_queue.push(done);

        debug!(
            packets = self.write_queue.len(),
            bytes = self.write_queue.pending_bytes(),
            "draining write queue"
        );

        while !self.write_queue.is_empty() {
            if let Err(e) = self.write_queue.flush(&mut *socket) {
                return Err(self.fail(CommError::Send(e)));
            }
        }

        info!(problem_id = %self.problem_id, "sent DONE");
        Ok(())
    }

    /// Queues `packet` behind everything already queued.
    ///
    /// It is written by the following `process` calls once connected.
    pub fn send(&mut self, packet: Packet) {
        let bytes = self.codec.encode(&packet);
        self.write_queue.push(bytes);
    }

    /// Closes the socket, if open. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            trace!(fd = socket.as_raw_fd(), "closing socket");

            if let Err(e) = socket.close() {
                warn!(error = %e, "error closing socket");
            }
        }

        self.state = ConnectionState::Disconnected;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` once the peer has sent `Done`.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn problem_id(&self) -> ProblemId {
        self.problem_id
    }

    /// Candidates tried since the last connect call.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Candidate list of the last connect call.
    pub fn addresses(&self) -> Option<&AddressList> {
        self.addrs.as_ref()
    }

    /// Address of the candidate the socket is connecting or connected to.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref()?;
        self.addrs.as_ref()?.current()
    }

    /// Packets queued and not yet fully written.
    pub fn pending_writes(&self) -> usize {
        self.write_queue.len()
    }

    /// Tries the remaining candidates in order until one connects or is
    /// in progress.
    fn try_connect(&mut self) {
        self.close();

        while let Some(addr) = self.addrs.as_ref().and_then(AddressList::current) {
            self.attempts += 1;
            info!(%addr, attempt = self.attempts, "connecting");

            let socket = match Socket::open(&addr) {
                Ok(socket) => socket,
                Err(e) => {
                    info!(%addr, error = %e, "failed to create socket");
                    self.skip_candidate();
                    continue;
                }
            };

            match socket.connect(&addr) {
                Ok(()) => {
                    self.socket = Some(socket);
                    self.on_connected();
                    return;
                }
                Err(e) if matches!(e.raw_os_error(), Some(EINPROGRESS | EINTR)) => {
                    debug!(%addr, "non-blocking connection in progress");
                    self.socket = Some(socket);
                    self.state = ConnectionState::Connecting;
                    return;
                }
                Err(e) => {
                    info!(%addr, error = %e, "connect failed");
                    drop(socket);
                    self.skip_candidate();
                }
            }
        }

        warn!(
            attempts = self.attempts,
            "no candidate address accepted the connection"
        );
        self.state = ConnectionState::Disconnected;
    }

    fn skip_candidate(&mut self) {
        if let Some(addrs) = self.addrs.as_mut() {
            addrs.advance();
        }
    }

    /// Checks a pending connect without waiting.
    ///
    /// Returns `true` if the session has just become `Connected`.
    fn poll_connect(&mut self) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            self.state = ConnectionState::Disconnected;
            return false;
        };

        let revents = match socket.poll_writable() {
            Ok(revents) => revents,
            Err(e) => {
                warn!(error = %e, "poll failed while waiting for connection");
                return false;
            }
        };

        if revents & (POLLHUP | POLLERR) != 0 {
            let reason = socket.take_error().err();
            warn!(revents, error = ?reason, "connection failed, trying next address");
            self.skip_candidate();
            self.try_connect();
            return false;
        }

        if revents & POLLOUT == 0 {
            if revents != 0 {
                warn!(revents, "unhandled events");
            }
            return false;
        }

        if let Err(e) = socket.take_error() {
            warn!(error = %e, "connection failed, trying next address");
            self.skip_candidate();
            self.try_connect();
            return false;
        }

        self.on_connected();
        true
    }

    /// Entered from both a synchronous connect and a completed pending one.
    fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        info!(peer = ?self.peer_addr(), "connected");

        let hello = self.codec.encode(&Packet::Hello {
            problem_id: self.problem_id,
        });
        self.write_queue.push(hello);
    }

    /// One flush, one receive and the dispatch of every complete packet.
    fn step_connected(&mut self) -> Result<()> {
        let Some(socket) = self.socket.as_mut() else {
            self.state = ConnectionState::Disconnected;
            return Ok(());
        };

        if !self.write_queue.is_empty() {
            match self.write_queue.flush(&mut *socket) {
                Ok(n) => trace!(bytes = n, "flushed"),
                Err(e) => return Err(self.fail(CommError::Send(e))),
            }
        }

        let received = match socket.recv(self.read_buffer.spare_mut()) {
            Ok(0) => {
                debug!("connection closed by peer");
                self.close();
                return Ok(());
            }
            Ok(n) => n,
            Err(e) if is_transient(&e) => return Ok(()),
            Err(e) => return Err(self.fail(CommError::Receive(e))),
        };

        trace!(bytes = received, "received");

        self.read_buffer.commit(received);
        self.read_buffer.flip();

        match self.dispatch_buffered() {
            Ok(needed) => {
                self.read_buffer.compact(needed);
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Decodes and handles every complete packet in the read buffer.
    ///
    /// Returns the number of bytes the next packet still needs.
    fn dispatch_buffered(&mut self) -> std::result::Result<usize, CodecError> {
        let mut packets = drain(&mut self.codec, &mut self.read_buffer);

        for packet in packets.by_ref() {
            match packet? {
                Packet::Done { problem_id } => {
                    if problem_id != self.problem_id {
                        warn!(
                            expected = %self.problem_id,
                            received = %problem_id,
                            "DONE for another problem"
                        );
                    }

                    info!("received DONE");
                    self.done = true;
                }
                Packet::Hello { problem_id } => {
                    warn!(%problem_id, "ignoring unexpected HELLO from peer");
                }
            }
        }

        Ok(packets.needed().unwrap_or(0))
    }

    fn fail(&mut self, err: CommError) -> CommError {
        error!(error = %err, "session terminated");
        self.close();
        err
    }
}
