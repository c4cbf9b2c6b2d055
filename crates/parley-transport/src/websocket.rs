//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! TCP accept runs in a background task and every socket is upgraded in a
//! task of its own, so a peer that never finishes the WebSocket handshake
//! cannot hold up the listener. Finished connections are queued for
//! [`Transport::accept`].

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// How long a freshly accepted socket may take to complete the
/// WebSocket upgrade.
pub const UPGRADE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upgraded connections waiting to be accepted.
const ACCEPT_BACKLOG: usize = 128;

/// Pause after a failed `accept(2)`, e.g. when out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<WebSocketConnection>,
    acceptor: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    ///
    /// Port `0` asks the OS for a free port; use
    /// [`local_addr`](Self::local_addr) to find out which.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let bind_failed = |source| TransportError::BindFailed {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_failed)?;
        let local_addr = listener.local_addr().map_err(bind_failed)?;

        let (tx, incoming) = mpsc::channel(ACCEPT_BACKLOG);
        let acceptor = tokio::spawn(accept_loop(listener, tx));

        tracing::info!(%local_addr, "WebSocket transport listening");
        Ok(Self {
            local_addr,
            incoming,
            acceptor,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.acceptor.abort();
        tracing::debug!(local_addr = %self.local_addr, "WebSocket transport stopped accepting");
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<WebSocketConnection>,
) {
    loop {
        let (stream, addr) = tokio::select! {
            _ = tx.closed() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
        };

        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(
                UPGRADE_TIMEOUT,
                tokio_tungstenite::accept_async(stream),
            )
            .await
            {
                Ok(Ok(ws)) => {
                    let conn = WebSocketConnection::new(ws, addr);
                    tracing::debug!(id = %conn.id, %addr, "accepted WebSocket connection");
                    // The receiver is gone once the transport is dropped.
                    let _ = tx.send(conn).await;
                }
                Ok(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "WebSocket upgrade failed");
                }
                Err(_) => {
                    tracing::debug!(%addr, "WebSocket upgrade timed out");
                }
            }
        });
    }
}

/// A single WebSocket connection.
///
/// The read and write halves are locked separately, so a task blocked in
/// [`recv`](Connection::recv) does not stop another task from sending.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn new(ws: WsStream, peer_addr: SocketAddr) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id: ConnectionId::next(),
            peer_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// Returns the remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = Message::Binary(data.to_vec().into());
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(TransportError::io(
                ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        TransportError::io(ErrorKind::ConnectionReset, e),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(TransportError::io(
                ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
