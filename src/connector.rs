//! Connecting side: dial the endpoint, send one message, read the reply.
//!
//! ```text
//! Idle -> Connected -> Exchanged -> Closed
//! ```

use crate::config::Config;
use crate::connection::Connection;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::exchange::{self, Exchange};
use crate::signal::ReadySignal;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, info};

/// Open a connection to `endpoint`.
///
/// Without a timeout this blocks for as long as the OS handshake takes.
/// A refused or unreachable peer fails immediately with `Error::Connect`.
pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Connection> {
    let addr = endpoint.addr();
    let stream = match timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
        None => TcpStream::connect(addr),
    }
    .map_err(|e| Error::Connect(addr, e))?;

    debug!(peer = %addr, "connected");
    Ok(Connection::new(stream, addr))
}

/// Observable state of a `Connector` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Idle,
    Connected,
    Exchanged,
    Closed,
}

impl ConnectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorState::Idle => "idle",
            ConnectorState::Connected => "connected",
            ConnectorState::Exchanged => "exchanged",
            ConnectorState::Closed => "closed",
        }
    }
}

enum Stage {
    Idle,
    Connected(Connection),
    Exchanged(Connection),
    Closed,
}

impl Stage {
    fn state(&self) -> ConnectorState {
        match self {
            Stage::Idle => ConnectorState::Idle,
            Stage::Connected(_) => ConnectorState::Connected,
            Stage::Exchanged(_) => ConnectorState::Exchanged,
            Stage::Closed => ConnectorState::Closed,
        }
    }
}

/// Single-shot connecting session.
pub struct Connector<S> {
    config: Config,
    signal: S,
    stage: Stage,
}

impl<S: ReadySignal> Connector<S> {
    pub fn new(config: Config, signal: S) -> Self {
        Self {
            config,
            signal,
            stage: Stage::Idle,
        }
    }

    pub fn state(&self) -> ConnectorState {
        self.stage.state()
    }

    /// Local address of the established connection.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.stage {
            Stage::Connected(c) | Stage::Exchanged(c) => c.local_addr().ok(),
            Stage::Idle | Stage::Closed => None,
        }
    }

    /// Connect to the configured endpoint.
    pub fn connect(&mut self) -> Result<SocketAddr> {
        match self.take_stage() {
            Stage::Idle => {}
            other => return self.out_of_order("connect", other),
        }

        let conn = connect(&self.config.endpoint, self.config.connect_timeout)?;
        conn.set_timeout(self.config.io_timeout)?;

        let peer = conn.peer_addr();
        info!(peer = %peer, "Connected");
        self.stage = Stage::Connected(conn);
        Ok(peer)
    }

    /// Wait for local confirmation, send the message, read the reply.
    pub fn exchange(&mut self) -> Result<Exchange> {
        self.exchange_with(|_| {})
    }

    /// Like `exchange`, calling `on_sent` once the message is written and
    /// before waiting for the reply.
    pub fn exchange_with<F: FnOnce(&[u8])>(&mut self, on_sent: F) -> Result<Exchange> {
        let mut conn = match self.take_stage() {
            Stage::Connected(conn) => conn,
            other => return self.out_of_order("exchange", other),
        };

        exchange::await_local_confirmation(&mut self.signal)?;
        let outcome = exchange::request(
            &mut conn,
            self.config.message.as_bytes(),
            self.config.max_message_len,
            on_sent,
        )?;

        self.stage = Stage::Exchanged(conn);
        Ok(outcome)
    }

    pub fn close(&mut self) {
        if let Stage::Connected(conn) | Stage::Exchanged(conn) = self.take_stage() {
            conn.close();
        }
    }

    /// Run the whole sequence: connect, exchange, close.
    pub fn run(self) -> Result<Exchange> {
        self.run_with(|_| {})
    }

    /// `run`, calling `on_sent` between writing the message and reading.
    pub fn run_with<F: FnOnce(&[u8])>(mut self, on_sent: F) -> Result<Exchange> {
        self.connect()?;
        let outcome = self.exchange_with(on_sent)?;
        self.close();
        Ok(outcome)
    }

    fn take_stage(&mut self) -> Stage {
        std::mem::replace(&mut self.stage, Stage::Closed)
    }

    fn out_of_order<T>(&mut self, operation: &'static str, stage: Stage) -> Result<T> {
        let state = stage.state().as_str();
        self.stage = stage;
        Err(Error::State { operation, state })
    }
}
