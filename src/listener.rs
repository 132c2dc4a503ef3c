//! Listening side: bind, listen, accept one peer, read then reply.
//!
//! The low-level steps (`bind`, `BoundSocket::listen`, `PassiveSocket::accept`)
//! are usable on their own. `Listener` drives them in order and tracks the
//! session state:
//!
//! ```text
//! Unbound -> Bound -> Listening -> Accepted -> Exchanged -> Closed
//! ```
//!
//! No transition is retried. Any failure moves the session to `Closed`,
//! dropping whatever socket it held.

use crate::config::Config;
use crate::connection::Connection;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::exchange::{self, Exchange};
use crate::signal::ReadySignal;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener};
use tracing::{debug, info};

/// Socket options applied before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// SO_REUSEADDR: rebind while old connections linger in TIME_WAIT.
    pub reuse_address: bool,
    /// SO_REUSEPORT: share the port with other sockets that also set it.
    pub reuse_port: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            reuse_address: true,
            reuse_port: false,
        }
    }
}

/// A socket bound to a local address but not yet accepting connections.
#[derive(Debug)]
pub struct BoundSocket {
    socket: Socket,
    addr: SocketAddr,
}

/// A socket accepting connections.
#[derive(Debug)]
pub struct PassiveSocket {
    listener: TcpListener,
    addr: SocketAddr,
}

/// Create a TCP socket for `endpoint`, apply `options` and bind it.
///
/// Fails with `Error::Bind` if the address is in use (and reuse-port was not
/// requested on every socket sharing it) or not available on this host.
pub fn bind(endpoint: &Endpoint, options: BindOptions) -> Result<BoundSocket> {
    let addr = endpoint.addr();
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(Error::Setup)?;

    apply_reuse(&socket, options).map_err(Error::Setup)?;

    socket.bind(&addr.into()).map_err(|e| Error::Bind(addr, e))?;

    // Port 0 resolves to an ephemeral port here
    let addr = socket
        .local_addr()
        .ok()
        .and_then(|a| a.as_socket())
        .unwrap_or(addr);

    debug!(address = %addr, ?options, "bound");
    Ok(BoundSocket { socket, addr })
}

#[cfg(unix)]
fn apply_reuse(socket: &Socket, options: BindOptions) -> io::Result<()> {
    if options.reuse_address {
        socket.set_reuse_address(true)?;
    }
    if options.reuse_port {
        socket.set_reuse_port(true)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_reuse(_socket: &Socket, options: BindOptions) -> io::Result<()> {
    if options.reuse_port {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "SO_REUSEPORT is only available on Unix",
        ));
    }
    Ok(())
}

impl BoundSocket {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start accepting connections with a pending queue of `backlog`.
    ///
    /// Connection attempts beyond the backlog are handled by the kernel.
    /// The backlog must be at least 1.
    pub fn listen(self, backlog: u32) -> Result<PassiveSocket> {
        let addr = self.addr;
        let invalid = |msg: &'static str| {
            Error::Listen(addr, io::Error::new(io::ErrorKind::InvalidInput, msg))
        };

        if backlog == 0 {
            return Err(invalid("backlog must be at least 1"));
        }
        let backlog = i32::try_from(backlog).map_err(|_| invalid("backlog too large"))?;

        self.socket
            .listen(backlog)
            .map_err(|e| Error::Listen(addr, e))?;

        debug!(address = %addr, backlog, "listening");
        Ok(PassiveSocket {
            listener: self.socket.into(),
            addr,
        })
    }
}

impl PassiveSocket {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until a peer connects.
    pub fn accept(&self) -> Result<Connection> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "accepted");
                    return Ok(Connection::new(stream, peer));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Accept(e)),
            }
        }
    }
}

/// Observable state of a `Listener` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Unbound,
    Bound,
    Listening,
    Accepted,
    Exchanged,
    Closed,
}

impl ListenerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ListenerState::Unbound => "unbound",
            ListenerState::Bound => "bound",
            ListenerState::Listening => "listening",
            ListenerState::Accepted => "accepted",
            ListenerState::Exchanged => "exchanged",
            ListenerState::Closed => "closed",
        }
    }
}

/// Session state with the resource each stage owns.
enum Stage {
    Unbound,
    Bound(BoundSocket),
    Listening(PassiveSocket),
    Accepted(Connection),
    Exchanged(Connection),
    Closed,
}

impl Stage {
    fn state(&self) -> ListenerState {
        match self {
            Stage::Unbound => ListenerState::Unbound,
            Stage::Bound(_) => ListenerState::Bound,
            Stage::Listening(_) => ListenerState::Listening,
            Stage::Accepted(_) => ListenerState::Accepted,
            Stage::Exchanged(_) => ListenerState::Exchanged,
            Stage::Closed => ListenerState::Closed,
        }
    }
}

/// Single-shot listening session.
pub struct Listener<S> {
    config: Config,
    signal: S,
    stage: Stage,
}

impl<S: ReadySignal> Listener<S> {
    /// Create an unbound session. `signal` gates the exchange step.
    pub fn new(config: Config, signal: S) -> Self {
        Self {
            config,
            signal,
            stage: Stage::Unbound,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.stage.state()
    }

    /// Bound or listening address; the accepted connection's local address
    /// once a peer is connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.stage {
            Stage::Bound(s) => Some(s.local_addr()),
            Stage::Listening(s) => Some(s.local_addr()),
            Stage::Accepted(c) | Stage::Exchanged(c) => c.local_addr().ok(),
            Stage::Unbound | Stage::Closed => None,
        }
    }

    /// Bind the configured endpoint.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        match self.take_stage() {
            Stage::Unbound => {}
            other => return self.out_of_order("bind", other),
        }

        let options = BindOptions {
            reuse_address: self.config.reuse_address,
            reuse_port: self.config.reuse_port,
        };
        let bound = bind(&self.config.endpoint, options)?;
        let addr = bound.local_addr();
        self.stage = Stage::Bound(bound);
        Ok(addr)
    }

    /// Start listening with the configured backlog.
    pub fn listen(&mut self) -> Result<()> {
        let bound = match self.take_stage() {
            Stage::Bound(bound) => bound,
            other => return self.out_of_order("listen", other),
        };

        let passive = bound.listen(self.config.backlog)?;
        info!(address = %passive.local_addr(), backlog = self.config.backlog, "Listening");
        self.stage = Stage::Listening(passive);
        Ok(())
    }

    /// Block until one peer connects. The passive socket is released once
    /// the connection is accepted; no further peers are taken.
    pub fn accept(&mut self) -> Result<SocketAddr> {
        let passive = match self.take_stage() {
            Stage::Listening(passive) => passive,
            other => return self.out_of_order("accept", other),
        };

        let conn = passive.accept()?;
        conn.set_timeout(self.config.io_timeout)?;

        let peer = conn.peer_addr();
        info!(peer = %peer, "Connection accepted");
        self.stage = Stage::Accepted(conn);
        Ok(peer)
    }

    /// Wait for local confirmation, read the peer's message, send the reply.
    pub fn exchange(&mut self) -> Result<Exchange> {
        self.exchange_with(|_| {})
    }

    /// Like `exchange`, calling `on_message` with the received bytes before
    /// the reply is written.
    pub fn exchange_with<F: FnOnce(&[u8])>(&mut self, on_message: F) -> Result<Exchange> {
        let mut conn = match self.take_stage() {
            Stage::Accepted(conn) => conn,
            other => return self.out_of_order("exchange", other),
        };

        exchange::await_local_confirmation(&mut self.signal)?;
        let outcome = exchange::respond(
            &mut conn,
            self.config.message.as_bytes(),
            self.config.max_message_len,
            on_message,
        )?;

        self.stage = Stage::Exchanged(conn);
        Ok(outcome)
    }

    /// Release whatever the session holds.
    pub fn close(&mut self) {
        match self.take_stage() {
            Stage::Accepted(conn) | Stage::Exchanged(conn) => conn.close(),
            Stage::Closed => {}
            other => debug!(state = other.state().as_str(), "listener closed"),
        }
    }

    /// Run the whole sequence: bind, listen, accept, exchange, close.
    pub fn run(self) -> Result<Exchange> {
        self.run_with(|_| {})
    }

    /// `run`, handing the received message to `on_message` before replying.
    pub fn run_with<F: FnOnce(&[u8])>(mut self, on_message: F) -> Result<Exchange> {
        self.bind()?;
        self.listen()?;
        self.accept()?;
        let outcome = self.exchange_with(on_message)?;
        self.close();
        Ok(outcome)
    }

    /// Move out the current stage, leaving `Closed` behind so that any
    /// early return is terminal.
    fn take_stage(&mut self) -> Stage {
        std::mem::replace(&mut self.stage, Stage::Closed)
    }

    fn out_of_order<T>(&mut self, operation: &'static str, stage: Stage) -> Result<T> {
        let state = stage.state().as_str();
        self.stage = stage;
        Err(Error::State { operation, state })
    }
}
