//! `ParleyServer` builder and accept loop.
//!
//! This is the entry point for running a Parley chat server. It ties the
//! layers together: transport → protocol → session → lobby.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parley_lobby::{LobbyConfig, LobbyHandle, spawn_lobby};
use parley_protocol::{Cipher, Codec, JsonCodec, Plaintext, Wire};
use parley_session::{Counter, Counters};
use parley_transport::{
    Connection, Transport, TransportError, WebSocketConnection,
    WebSocketTransport,
};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::{ParleyError, ServerConfig, handler, rejection, shutdown};

/// Shared server state passed to each connection task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here needs a lock: the roster lives in the lobby actor and the
/// counters are atomics.
pub(crate) struct ServerState<C: Codec, K: Cipher> {
    pub(crate) lobby: LobbyHandle,
    pub(crate) wire: Wire<C, K>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Parley server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn start() -> Result<(), parley::ParleyError> {
/// use parley::prelude::*;
///
/// let server = ParleyServer::builder()
///     .bind("0.0.0.0:8000")
///     .max_clients(100)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ParleyServerBuilder {
    config: ServerConfig,
    bind_addr: Option<String>,
}

impl ParleyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bind_addr: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind to, overriding the configured host and
    /// port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Sets the port, keeping the configured host.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the maximum number of online clients (0 = unlimited).
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.config.max_clients = max_clients;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Kicks online clients that send nothing for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Drops clients whose socket accepts no data for `timeout`.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Binds the listener using `JsonCodec` and no encryption.
    pub async fn build(
        self,
    ) -> Result<ParleyServer<JsonCodec, Plaintext>, ParleyError> {
        self.build_with(JsonCodec, Plaintext).await
    }

    /// Binds the listener using JSON frames sealed by `cipher`.
    pub async fn build_with_cipher<K: Cipher>(
        self,
        cipher: K,
    ) -> Result<ParleyServer<JsonCodec, K>, ParleyError> {
        self.build_with(JsonCodec, cipher).await
    }

    /// Binds the listener with an explicit codec and cipher.
    pub async fn build_with<C: Codec, K: Cipher>(
        self,
        codec: C,
        cipher: K,
    ) -> Result<ParleyServer<C, K>, ParleyError> {
        let addr = self
            .bind_addr
            .unwrap_or_else(|| self.config.bind_addr());
        let transport = WebSocketTransport::bind(&addr).await?;

        let counters = Arc::new(Counters::new());
        let lobby = spawn_lobby(
            LobbyConfig {
                max_clients: self.config.max_clients,
                ..LobbyConfig::default()
            },
            Arc::clone(&counters),
        );

        let state = Arc::new(ServerState {
            lobby,
            wire: Wire::new(codec, cipher),
            counters,
            config: self.config,
        });

        Ok(ParleyServer { transport, state })
    }
}

impl Default for ParleyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Parley chat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParleyServer<C: Codec, K: Cipher> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C, K>>,
}

impl ParleyServer<JsonCodec, Plaintext> {
    /// Creates a new builder.
    pub fn builder() -> ParleyServerBuilder {
        ParleyServerBuilder::new()
    }
}

impl<C: Codec, K: Cipher> ParleyServer<C, K> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// The server's activity counters.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.state.counters)
    }

    /// A handle to the lobby, e.g. to inspect the roster.
    pub fn lobby(&self) -> LobbyHandle {
        self.state.lobby.clone()
    }

    /// Runs until Ctrl-C or SIGTERM, then shuts down gracefully.
    pub async fn run(self) -> Result<(), ParleyError> {
        self.run_until(shutdown::termination_signal()).await
    }

    /// Runs the accept loop until `signal` completes, then shuts down
    /// gracefully: every client is kicked and every session task is
    /// given [`ServerConfig::shutdown_grace`] to finish.
    pub async fn run_until(
        mut self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), ParleyError> {
        tracing::info!(
            addr = %self.local_addr(),
            max_clients = self.state.config.max_clients,
            "Parley server running"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    tracing::info!("*** SERVER IS GOING DOWN ***");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => self.admit(conn, &mut sessions, shutdown_rx.clone()),
                    Err(TransportError::Shutdown) => {
                        tracing::error!("listener stopped unexpectedly");
                        break;
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "connection task panicked");
                        }
                    }
                }
            }
        }

        self.transport.shutdown().await?;
        shutdown::coordinate(&self.state, sessions, shutdown_tx).await;
        Ok(())
    }

    /// Starts a task for a freshly accepted connection: a full session if
    /// there is room, otherwise the rejection handshake.
    fn admit(
        &self,
        conn: WebSocketConnection,
        sessions: &mut JoinSet<()>,
        shutdown: watch::Receiver<bool>,
    ) {
        self.state.counters.increment(Counter::Connections);
        let state = Arc::clone(&self.state);

        sessions.spawn(async move {
            let conn_id = conn.id();
            // A stopped lobby means shutdown is under way; the handler
            // kicks the client once the flag goes up.
            let full = match state.lobby.info().await {
                Ok(info) => info.is_full(),
                Err(_) => false,
            };

            let result = if full {
                rejection::reject(conn, &state).await
            } else {
                handler::handle_connection(conn, Arc::clone(&state), shutdown)
                    .await
            };
            if let Err(e) = result {
                tracing::debug!(%conn_id, error = %e, "connection ended with error");
            }
        });
    }
}
