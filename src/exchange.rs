//! The one-message-each exchange carried over a connection.
//!
//! The connector writes its message and then reads; the listener reads and
//! then writes its reply. There is no framing: each side performs a single
//! bounded read, so only payloads that arrive within one read (short fixed
//! strings) are guaranteed to be observed whole.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::signal::ReadySignal;
use bytes::Bytes;
use std::borrow::Cow;
use std::net::SocketAddr;
use tracing::{debug, info};

/// Outcome of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Address of the other side.
    pub peer: SocketAddr,
    /// Bytes written to the peer.
    pub sent: Bytes,
    /// Exactly the bytes read from the peer; empty if it closed first.
    pub received: Bytes,
}

impl Exchange {
    /// Lossy text of the received bytes.
    pub fn received_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.received)
    }
}

/// Block on the local ready signal.
pub(crate) fn await_local_confirmation<S: ReadySignal>(signal: &mut S) -> Result<()> {
    debug!("waiting for local confirmation");
    signal.wait().map_err(Error::Confirm)?;
    debug!("confirmed");
    Ok(())
}

/// Connector order: send `message`, then read up to `max_len` bytes.
/// `on_sent` runs once the message is fully written, before the read.
pub(crate) fn request<F: FnOnce(&[u8])>(
    conn: &mut Connection,
    message: &[u8],
    max_len: usize,
    on_sent: F,
) -> Result<Exchange> {
    conn.send(message)?;
    info!(peer = %conn.peer_addr(), bytes = message.len(), "message sent");
    on_sent(message);

    let received = conn.receive(max_len)?;
    info!(peer = %conn.peer_addr(), bytes = received.len(), "reply received");

    Ok(Exchange {
        peer: conn.peer_addr(),
        sent: Bytes::copy_from_slice(message),
        received,
    })
}

/// Listener order: read up to `max_len` bytes, then send `reply`.
/// `on_message` sees the received bytes before the reply is written.
pub(crate) fn respond<F: FnOnce(&[u8])>(
    conn: &mut Connection,
    reply: &[u8],
    max_len: usize,
    on_message: F,
) -> Result<Exchange> {
    let received = conn.receive(max_len)?;
    info!(peer = %conn.peer_addr(), bytes = received.len(), "message received");
    on_message(&received[..]);

    conn.send(reply)?;
    info!(peer = %conn.peer_addr(), bytes = reply.len(), "reply sent");

    Ok(Exchange {
        peer: conn.peer_addr(),
        sent: Bytes::copy_from_slice(reply),
        received,
    })
}
