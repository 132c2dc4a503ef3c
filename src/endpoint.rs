//! Network endpoint: the address a listener binds or a connector dials.

use crate::error::{Error, Result};
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Port used when no endpoint is configured.
pub const DEFAULT_PORT: u16 = 5984;

/// An immutable (address, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    addr: SocketAddr,
}

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Loopback on the given port. Port 0 lets the OS pick a free port.
    pub fn loopback(port: u16) -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    /// Parse `host:port`.
    ///
    /// Literal socket addresses are taken as-is; host names are resolved
    /// and the first resulting address is used.
    pub fn parse(text: &str) -> Result<Self> {
        if let Ok(addr) = text.parse::<SocketAddr>() {
            return Ok(Self::new(addr));
        }

        let mut addrs = text
            .to_socket_addrs()
            .map_err(|e| Error::Address(text.to_string(), e))?;

        addrs.next().map(Self::new).ok_or_else(|| {
            Error::Address(
                text.to_string(),
                io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
            )
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::loopback(DEFAULT_PORT)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}
