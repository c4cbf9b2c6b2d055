//! Byte-frame transports for Parley.
//!
//! The chat server never touches sockets directly. It pulls connections
//! from a [`Transport`] and exchanges whole frames with each
//! [`Connection`], one encoded packet per frame.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] on `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{UPGRADE_TIMEOUT, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique number given to every accepted connection.
///
/// Shown as `conn-N` in logs. Ids start at 1 and are never reused while
/// the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of incoming connections, e.g. a listening socket.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next connection that is ready to exchange frames.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new connections. Ones already handed out stay open.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One peer, exchanging whole frames.
///
/// `send` must make progress while another task is parked in `recv`: the
/// server reads and writes each connection from separate tasks.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads one frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Tells the peer goodbye and shuts the write side.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_ids_are_increasing_and_distinct() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b > a);
        assert!(a.get() >= 1);
    }

    #[test]
    fn test_display_uses_conn_prefix() {
        let id = ConnectionId::next();
        assert_eq!(id.to_string(), format!("conn-{}", id.get()));
    }

    #[test]
    fn test_bind_failed_display_names_address() {
        let err = TransportError::BindFailed {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
