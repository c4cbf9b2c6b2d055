//! Error types for the session layer.

use crate::ConnectionState;
use crate::name::{MAX_NAME_LEN, MIN_NAME_LEN};

/// Kick reason for any client that breaks the protocol.
pub const SECURITY_BREACH: &str =
    "Security breach: Please do not use a modified client";

/// Errors that can occur while a client logs in or changes state.
///
/// Every variant that ends a session maps to the text the client is
/// kicked with, see [`kick_reason`](SessionError::kick_reason).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The requested display name is too short or too long.
    #[error("name must be 4 to 15 characters long, got {len}")]
    NameLength { len: usize },

    /// Another online session already uses this name.
    #[error("name {0:?} is already in use")]
    NameInUse(String),

    /// The client sent a packet that is not allowed in its current state,
    /// e.g. a chat message before logging in.
    #[error("unexpected {0} packet")]
    UnexpectedPacket(&'static str),

    /// The client did not log in within the handshake timeout.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// A state change the session state machine does not allow.
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

impl SessionError {
    /// The text sent to the client in its `Kick` packet.
    pub fn kick_reason(&self) -> String {
        match self {
            Self::NameLength { .. } => format!(
                "Please make sure that your nickname has between {MIN_NAME_LEN} and {MAX_NAME_LEN} letters"
            ),
            Self::NameInUse(name) => {
                format!("The nickname \"{name}\" is already in use")
            }
            Self::HandshakeTimeout => "Login timed out".to_string(),
            Self::UnexpectedPacket(_) | Self::InvalidTransition { .. } => {
                SECURITY_BREACH.to_string()
            }
        }
    }
}
