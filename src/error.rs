//! Error type shared by the listener and connector.
//!
//! Every variant is terminal: the single-shot programs report the failing
//! step and its cause, then exit.

use std::io;
use std::net::SocketAddr;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A failed handshake step.
#[derive(Debug)]
pub enum Error {
    /// Endpoint text could not be parsed or resolved.
    Address(String, io::Error),
    /// Socket creation or option configuration failed.
    Setup(io::Error),
    /// Binding the local endpoint failed.
    Bind(SocketAddr, io::Error),
    /// Marking the bound socket passive failed.
    Listen(SocketAddr, io::Error),
    /// Establishing the outbound connection failed.
    Connect(SocketAddr, io::Error),
    /// Waiting for an inbound connection failed.
    Accept(io::Error),
    /// The local ready signal failed.
    Confirm(io::Error),
    /// Writing to an established connection failed.
    Send(io::Error),
    /// Reading from an established connection failed.
    Receive(io::Error),
    /// A step was attempted in the wrong session state.
    State {
        operation: &'static str,
        state: &'static str,
    },
}

impl Error {
    /// Short name of the step that failed, used in diagnostics.
    pub fn step(&self) -> &'static str {
        match self {
            Error::Address(..) => "address resolution",
            Error::Setup(_) => "socket setup",
            Error::Bind(..) => "bind",
            Error::Listen(..) => "listen",
            Error::Connect(..) => "connection",
            Error::Accept(_) => "accept",
            Error::Confirm(_) => "local confirmation",
            Error::Send(_) => "send",
            Error::Receive(_) => "receive",
            Error::State { .. } => "state check",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Address(text, e) => write!(f, "invalid endpoint '{text}': {e}"),
            Error::Setup(e) => write!(f, "socket setup failed: {e}"),
            Error::Bind(addr, e) => write!(f, "bind to {addr} failed: {e}"),
            Error::Listen(addr, e) => write!(f, "listen on {addr} failed: {e}"),
            Error::Connect(addr, e) => write!(f, "connection to {addr} failed: {e}"),
            Error::Accept(e) => write!(f, "accept failed: {e}"),
            Error::Confirm(e) => write!(f, "local confirmation failed: {e}"),
            Error::Send(e) => write!(f, "send failed: {e}"),
            Error::Receive(e) => write!(f, "receive failed: {e}"),
            Error::State { operation, state } => {
                write!(f, "cannot {operation} while {state}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Address(_, e)
            | Error::Setup(e)
            | Error::Bind(_, e)
            | Error::Listen(_, e)
            | Error::Connect(_, e)
            | Error::Accept(e)
            | Error::Confirm(e)
            | Error::Send(e)
            | Error::Receive(e) => Some(e),
            Error::State { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_names_step() {
        let addr: SocketAddr = "127.0.0.1:5984".parse().unwrap();
        let err = Error::Connect(addr, io::Error::from(io::ErrorKind::ConnectionRefused));
        let msg = err.to_string();
        assert!(msg.starts_with("connection to 127.0.0.1:5984 failed"), "{msg}");
        assert_eq!(err.step(), "connection");
    }

    #[test]
    fn test_source() {
        let err = Error::Send(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.source().is_some());

        let err = Error::State {
            operation: "send",
            state: "idle",
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "cannot send while idle");
    }
}
