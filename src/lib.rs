//! tcp-handshake: a single-shot TCP message exchange
//!
//! Two programs share this library:
//! - `listener`: binds an endpoint, accepts one peer, reads its message
//!   and replies
//! - `connector`: connects to the endpoint, sends its message and reads
//!   the reply
//!
//! Each side waits on a local ready signal before exchanging. There is
//! no framing: one bounded read and one complete write per side.

pub mod buffer;
pub mod config;
pub mod connection;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod listener;
pub mod logging;
pub mod signal;

pub use buffer::MessageBuffer;
pub use config::{Config, ConfigError, Role};
pub use connection::Connection;
pub use connector::{connect, Connector, ConnectorState};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use exchange::Exchange;
pub use listener::{bind, BindOptions, BoundSocket, Listener, ListenerState, PassiveSocket};
pub use signal::ReadySignal;
