//! Unified error type for the Parley server.

use parley_lobby::LobbyError;
use parley_protocol::ProtocolError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, cipher).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (name rules, state transitions).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (full, stopped).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Local I/O, e.g. preparing the log directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The logging subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Shutdown;
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Transport(_)));
        assert_eq!(parley_err.to_string(), "transport shut down");
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NameInUse("alice".into());
        let parley_err: ParleyError = err.into();
        assert!(matches!(parley_err, ParleyError::Session(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let parley_err: ParleyError = LobbyError::Full.into();
        assert!(matches!(parley_err, ParleyError::Lobby(_)));
    }
}
