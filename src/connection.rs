//! An established TCP connection owned by one side of the exchange.

use crate::buffer::MessageBuffer;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, trace};

/// Bidirectional byte stream to a single peer.
///
/// The socket is closed when the connection is dropped.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr().map_err(Error::Setup)
    }

    /// Apply a read/write timeout. `None` blocks indefinitely.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout).map_err(Error::Setup)?;
        self.stream.set_write_timeout(timeout).map_err(Error::Setup)?;
        Ok(())
    }

    /// Write all of `data`, retrying partial and interrupted writes.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).map_err(Error::Send)?;
        self.stream.flush().map_err(Error::Send)?;
        trace!(peer = %self.peer, bytes = data.len(), "sent");
        Ok(())
    }

    /// Block until at least one byte arrives or the peer closes, then return
    /// up to `max_len` bytes. An empty result means the peer closed, so
    /// `max_len` must be at least 1.
    pub fn receive(&mut self, max_len: usize) -> Result<Bytes> {
        let mut buf = MessageBuffer::new(max_len);
        self.receive_into(&mut buf)?;
        Ok(buf.take())
    }

    /// Single read into `buf`; returns the number of bytes added. Zero means
    /// the peer closed. A buffer with no room left is rejected.
    pub fn receive_into(&mut self, buf: &mut MessageBuffer) -> Result<usize> {
        if buf.is_full() {
            return Err(Error::Receive(io::Error::new(
                io::ErrorKind::InvalidInput,
                "receive buffer has no room",
            )));
        }

        let n = buf.read_from(&mut self.stream).map_err(Error::Receive)?;
        if n == 0 {
            debug!(peer = %self.peer, "peer closed connection");
        } else {
            trace!(peer = %self.peer, bytes = n, "received");
        }
        Ok(n)
    }

    /// Shut down both directions and release the socket.
    pub fn close(self) {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => debug!(peer = %self.peer, "connection closed"),
            // The peer may have closed first
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                debug!(peer = %self.peer, "connection already closed by peer")
            }
            Err(e) => debug!(peer = %self.peer, error = %e, "shutdown failed"),
        }
    }
}
