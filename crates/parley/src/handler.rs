//! Per-connection handler: login, then the read/route loop.
//!
//! Each admitted connection gets its own Tokio task running this handler,
//! plus a writer task that is the only thing writing to the socket. The
//! flow is:
//!   1. Receive Connect → ask the lobby to register the name
//!   2. Loop: receive packets → route them through the lobby
//!   3. Leave the roster, let the writer flush its queue, close

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parley_lobby::{LobbyHandle, SHUTDOWN_REASON, Verdict};
use parley_protocol::{Cipher, Codec, Packet};
use parley_session::{
    ClientSession, Counter, Outbound, SessionError, SessionId,
};
use parley_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::{mpsc, oneshot, watch};

use crate::ParleyError;
use crate::server::ServerState;

/// Kick reason for an online client that stayed silent too long.
pub const IDLE_REASON: &str = "Idle timeout";

/// One read from the connection, or why there wasn't one.
enum Frame {
    Packet(Packet),
    Closed,
    Failed(TransportError),
    /// The writer gave up on the peer; already counted by the writer.
    WriteFailed(TransportError),
    TimedOut,
    Shutdown,
}

/// Everything besides the socket that can wake a blocked read.
struct Interrupts {
    shutdown: watch::Receiver<bool>,
    writer_failed: oneshot::Receiver<TransportError>,
}

/// How a session ended.
enum Ending {
    /// The client said goodbye or closed its socket.
    Left,
    Kicked(String),
    /// The transport failed under the session.
    Lost(TransportError),
}

/// Drop guard that takes a session off the roster when the handler exits.
///
/// Once a session is online the lobby holds a sender for its outbound
/// queue, and the writer task only finishes when every sender is gone.
/// A session that ends without leaving the roster would therefore keep
/// its writer, its socket and its name alive forever.
///
/// The guard is created right after a successful join and consumed on
/// every exit path:
///
/// - [`release`](Self::release) when the handler itself decides the
///   session is over (peer closed, transport failed, idle timeout). It
///   awaits the leave so the `Delta` is broadcast before the handler goes
///   on.
/// - [`disarm`](Self::disarm) when the lobby already removed the session
///   (a `Disconnect` or kick verdict, or shutdown draining the roster).
///
/// If the handler task is aborted instead, say by the shutdown grace
/// period running out, `Drop` spawns the leave, since it cannot await.
struct RosterGuard {
    id: SessionId,
    name: String,
    lobby: LobbyHandle,
    armed: bool,
}

impl RosterGuard {
    /// Leaves the roster and waits for the lobby to confirm.
    async fn release(mut self) {
        self.armed = false;
        let _ = self.lobby.leave(self.id, self.name.clone()).await;
    }

    /// The lobby already took the session off the roster.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RosterGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let lobby = self.lobby.clone();
        let id = self.id;
        let name = std::mem::take(&mut self.name);
        tokio::spawn(async move {
            let _ = lobby.leave(id, name).await;
        });
    }
}

/// Handles a single admitted connection from accept to close.
pub(crate) async fn handle_connection<C, K>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C, K>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ParleyError>
where
    C: Codec,
    K: Cipher,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let mut session = ClientSession::new(SessionId(conn_id.get()));
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (outbound, rx) = mpsc::unbounded_channel();
    let (failed_tx, failed_rx) = oneshot::channel();
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        Arc::clone(&state),
        rx,
        failed_tx,
    ));
    let mut interrupts = Interrupts {
        shutdown,
        writer_failed: failed_rx,
    };

    let result =
        run_session(&conn, &state, &mut session, &outbound, &mut interrupts)
            .await;

    // The writer stops once every sender is gone: this one, and the
    // lobby's copy, which went away when the session left the roster.
    drop(outbound);
    let _ = writer.await;

    let ending = result?;
    // Sessions that logged in were counted by the lobby when they left.
    if session.name().is_none() {
        state.counters.increment(Counter::Disconnects);
    }

    let name = session.name().unwrap_or("-");
    match ending {
        Ending::Left => tracing::info!(%conn_id, name, "has disconnected"),
        Ending::Kicked(reason) => {
            state.counters.increment(Counter::Kicks);
            tracing::info!(%conn_id, name, %reason, "has been kicked");
        }
        Ending::Lost(e) => {
            tracing::info!(%conn_id, name, error = %e, "connection lost");
        }
    }
    Ok(())
}

async fn run_session<C, K>(
    conn: &WebSocketConnection,
    state: &ServerState<C, K>,
    session: &mut ClientSession,
    outbound: &Outbound,
    interrupts: &mut Interrupts,
) -> Result<Ending, ParleyError>
where
    C: Codec,
    K: Cipher,
{
    // --- Step 1: Login ---
    let name = match perform_handshake(conn, state, interrupts).await {
        Ok(name) => name,
        Err(Ending::Kicked(reason)) => {
            let _ = outbound.send(Packet::kick(&reason));
            session.kick()?;
            return Ok(Ending::Kicked(reason));
        }
        Err(ending) => {
            session.request_disconnect()?;
            return Ok(ending);
        }
    };

    if let Err(e) = state
        .lobby
        .join(session.id(), name.clone(), outbound.clone())
        .await
    {
        tracing::debug!(conn_id = %conn.id(), name, error = %e, "login refused");
        let reason = e.kick_reason(&name);
        let _ = outbound.send(Packet::kick(&reason));
        session.kick()?;
        return Ok(Ending::Kicked(reason));
    }
    session.go_online(name.clone())?;

    let guard = RosterGuard {
        id: session.id(),
        name: name.clone(),
        lobby: state.lobby.clone(),
        armed: true,
    };

    // --- Step 2: Read loop ---
    loop {
        let frame =
            next_frame(conn, state, state.config.idle_timeout, interrupts)
                .await;
        let packet = match frame {
            Frame::Packet(packet) => packet,
            Frame::Closed => {
                guard.release().await;
                session.request_disconnect()?;
                return Ok(Ending::Left);
            }
            Frame::Failed(e) => {
                state.counters.increment(Counter::Exceptions);
                guard.release().await;
                session.request_disconnect()?;
                return Ok(Ending::Lost(e));
            }
            Frame::WriteFailed(e) => {
                guard.release().await;
                session.request_disconnect()?;
                return Ok(Ending::Lost(e));
            }
            Frame::TimedOut => {
                // Off the roster first, so the kick is the last thing queued.
                guard.release().await;
                let _ = outbound.send(Packet::kick(IDLE_REASON));
                session.kick()?;
                return Ok(Ending::Kicked(IDLE_REASON.to_string()));
            }
            Frame::Shutdown => {
                // The lobby kicked everyone before raising the flag.
                guard.disarm();
                session.kick()?;
                return Ok(Ending::Kicked(SHUTDOWN_REASON.to_string()));
            }
        };

        match state.lobby.route(session.id(), name.clone(), packet).await {
            Ok(Verdict::Continue) => {}
            Ok(Verdict::Disconnect) => {
                guard.disarm();
                session.request_disconnect()?;
                return Ok(Ending::Left);
            }
            Ok(Verdict::Kick(reason)) => {
                guard.disarm();
                session.kick()?;
                return Ok(Ending::Kicked(reason));
            }
            Err(_) => {
                guard.disarm();
                session.kick()?;
                return Ok(Ending::Kicked(SHUTDOWN_REASON.to_string()));
            }
        }
    }
}

/// Waits for the first packet and extracts the requested name.
///
/// `Err` carries how the session ends instead: a kick reason, a silent
/// goodbye, or a lost connection.
async fn perform_handshake<C, K>(
    conn: &WebSocketConnection,
    state: &ServerState<C, K>,
    interrupts: &mut Interrupts,
) -> Result<String, Ending>
where
    C: Codec,
    K: Cipher,
{
    let limit = Some(state.config.handshake_timeout);
    match next_frame(conn, state, limit, interrupts).await {
        Frame::Packet(Packet::Connect { name }) => Ok(name),
        Frame::Packet(Packet::Disconnect) | Frame::Closed => Err(Ending::Left),
        Frame::Packet(other) => {
            let err = SessionError::UnexpectedPacket(other.kind());
            tracing::debug!(conn_id = %conn.id(), error = %err, "bad first packet");
            Err(Ending::Kicked(err.kick_reason()))
        }
        Frame::TimedOut => {
            Err(Ending::Kicked(SessionError::HandshakeTimeout.kick_reason()))
        }
        Frame::Shutdown => Err(Ending::Kicked(SHUTDOWN_REASON.to_string())),
        Frame::Failed(e) => {
            state.counters.increment(Counter::Exceptions);
            Err(Ending::Lost(e))
        }
        Frame::WriteFailed(e) => Err(Ending::Lost(e)),
    }
}

/// Reads the next frame, giving up after `limit`, when the server shuts
/// down, or when the writer has lost the peer.
async fn next_frame<C, K>(
    conn: &WebSocketConnection,
    state: &ServerState<C, K>,
    limit: Option<Duration>,
    interrupts: &mut Interrupts,
) -> Frame
where
    C: Codec,
    K: Cipher,
{
    let read = async {
        match limit {
            Some(limit) => tokio::time::timeout(limit, conn.recv()).await.ok(),
            None => Some(conn.recv().await),
        }
    };

    tokio::select! {
        biased;
        _ = interrupts.shutdown.wait_for(|down| *down) => Frame::Shutdown,
        failed = &mut interrupts.writer_failed => match failed {
            Ok(e) => Frame::WriteFailed(e),
            // The writer outlives the session unless it failed.
            Err(_) => Frame::Closed,
        },
        read = read => match read {
            None => Frame::TimedOut,
            Some(Ok(Some(bytes))) => Frame::Packet(decode(conn, state, &bytes)),
            Some(Ok(None)) => Frame::Closed,
            Some(Err(e)) => Frame::Failed(e),
        },
    }
}

/// Decodes a frame; anything undecodable becomes [`Packet::Invalid`].
fn decode<C: Codec, K: Cipher>(
    conn: &WebSocketConnection,
    state: &ServerState<C, K>,
    frame: &[u8],
) -> Packet {
    match state.wire.try_decode(frame) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "undecodable frame");
            state.counters.increment(Counter::Exceptions);
            Packet::Invalid
        }
    }
}

/// Drains the session's outbound queue onto the socket, then closes it.
///
/// Each write is bounded by
/// [`ServerConfig::write_timeout`](crate::ServerConfig::write_timeout).
/// A peer that stops reading fills its socket buffers and stalls the
/// write. Rather than let its queue grow for as long as others keep
/// chatting, the writer gives up, reports the failure on `failed` and
/// leaves without closing, since the close frame would stall too. The
/// reader then ends the session.
async fn write_loop<C: Codec, K: Cipher>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C, K>>,
    mut rx: mpsc::UnboundedReceiver<Packet>,
    failed: oneshot::Sender<TransportError>,
) {
    let limit = state.config.write_timeout;

    while let Some(packet) = rx.recv().await {
        let frame = match state.wire.encode(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), kind = packet.kind(), error = %e, "dropping unencodable packet");
                continue;
            }
        };
        let sent = match tokio::time::timeout(limit, conn.send(&frame)).await {
            Ok(sent) => sent,
            Err(_) => Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::TimedOut,
                "peer stopped reading",
            ))),
        };
        if let Err(e) = sent {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            state.counters.increment(Counter::Exceptions);
            let _ = failed.send(e);
            return;
        }
    }
    let _ = tokio::time::timeout(limit, conn.close()).await;
}
