//! Turning away connections that arrive while the lobby is full.
//!
//! The client is still owed an explanation, so the rejection runs a
//! miniature handshake: read the first packet, answer with a `Kick`, close.

use parley_lobby::too_many_clients;
use parley_protocol::{Cipher, Codec, Packet};
use parley_session::{Counter, SECURITY_BREACH, SessionError};
use parley_transport::{Connection, WebSocketConnection};

use crate::ParleyError;
use crate::server::ServerState;

/// Reads the first packet from `conn`, kicks it with the matching reason
/// and closes the connection.
///
/// A client that closes before saying anything gets no reply.
pub(crate) async fn reject<C: Codec, K: Cipher>(
    conn: WebSocketConnection,
    state: &ServerState<C, K>,
) -> Result<(), ParleyError> {
    state.counters.increment(Counter::Rejections);
    let conn_id = conn.id();

    let first = tokio::time::timeout(
        state.config.handshake_timeout,
        conn.recv(),
    )
    .await;

    let reason = match first {
        Ok(Ok(Some(frame))) => match state.wire.try_decode(&frame) {
            Ok(Packet::Connect { name }) => too_many_clients(&name),
            Ok(_) | Err(_) => SECURITY_BREACH.to_string(),
        },
        Ok(Ok(None)) => return Ok(()),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => SessionError::HandshakeTimeout.kick_reason(),
    };

    tracing::info!(%conn_id, %reason, "rejected connection");
    let frame = state.wire.encode(&Packet::kick(reason))?;
    conn.send(&frame).await?;
    conn.close().await?;
    Ok(())
}
