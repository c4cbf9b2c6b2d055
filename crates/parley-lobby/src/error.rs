//! Error types for the lobby layer.

use parley_session::SessionError;

use crate::SHUTDOWN_REASON;

/// Errors that can occur when talking to the lobby.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The login was refused because of the requested name.
    #[error(transparent)]
    Rejected(#[from] SessionError),

    /// The configured number of online clients has been reached.
    #[error("lobby is full")]
    Full,

    /// The lobby actor has stopped (server shutdown).
    #[error("lobby is unavailable")]
    Unavailable,
}

impl LobbyError {
    /// The text a client is kicked with when its login fails with this
    /// error. `name` is the name it asked for.
    pub fn kick_reason(&self, name: &str) -> String {
        match self {
            Self::Rejected(e) => e.kick_reason(),
            Self::Full => too_many_clients(name),
            Self::Unavailable => SHUTDOWN_REASON.to_string(),
        }
    }
}

/// Kick text for a client turned away by admission control.
pub fn too_many_clients(name: &str) -> String {
    format!("Sorry \"{name}\", too many clients. Please try later.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kick_reason_full_names_client() {
        assert_eq!(
            LobbyError::Full.kick_reason("alice"),
            "Sorry \"alice\", too many clients. Please try later."
        );
    }

    #[test]
    fn test_kick_reason_rejected_uses_session_text() {
        let err: LobbyError = SessionError::NameInUse("alice".into()).into();
        assert!(err.kick_reason("alice").contains("already in use"));
    }
}
