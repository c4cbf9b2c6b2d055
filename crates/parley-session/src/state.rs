//! The per-connection state machine.
//!
//! ```text
//!   InLogin ──(Connect ok)──→ Online ──(Disconnect)──→ RequestedDisconnect
//!      │                        │
//!      │                        └──(protocol violation)──→ Kicked
//!      ├──(bad name / bad first packet)──→ Kicked
//!      └──(Disconnect)──→ RequestedDisconnect
//! ```
//!
//! `Kicked` and `RequestedDisconnect` are terminal: the session is removed
//! from the roster and its transport closed.

use std::fmt;

use crate::SessionError;

/// Identity of one client session, unique for the life of the process.
///
/// Two sessions that log in under the same name at different times have
/// different ids, which is how the roster tells a stale removal apart from
/// a current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Where a client is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no name yet.
    InLogin,
    /// Logged in and listed on the roster.
    Online,
    /// Removed by the server.
    Kicked,
    /// Left on its own (or its connection dropped).
    RequestedDisconnect,
}

impl ConnectionState {
    /// `true` for the two states a session never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Kicked | Self::RequestedDisconnect)
    }
}

/// One client's session as seen by its own connection task.
#[derive(Debug, Clone)]
pub struct ClientSession {
    id: SessionId,
    name: Option<String>,
    state: ConnectionState,
}

impl ClientSession {
    /// A fresh session waiting for its `Connect` packet.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            name: None,
            state: ConnectionState::InLogin,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The display name, once logged in.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == ConnectionState::Online
    }

    /// `InLogin → Online`. The caller registers the name first.
    pub fn go_online(&mut self, name: String) -> Result<(), SessionError> {
        self.transition(ConnectionState::Online)?;
        self.name = Some(name);
        Ok(())
    }

    /// `InLogin | Online → Kicked`.
    pub fn kick(&mut self) -> Result<(), SessionError> {
        self.transition(ConnectionState::Kicked)
    }

    /// `InLogin | Online → RequestedDisconnect`.
    pub fn request_disconnect(&mut self) -> Result<(), SessionError> {
        self.transition(ConnectionState::RequestedDisconnect)
    }

    fn transition(&mut self, to: ConnectionState) -> Result<(), SessionError> {
        use ConnectionState::*;

        let allowed = match (self.state, to) {
            (InLogin, Online) => true,
            (InLogin | Online, Kicked | RequestedDisconnect) => true,
            _ => false,
        };
        if !allowed {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        tracing::trace!(id = %self.id, from = ?self.state, ?to, "session state change");
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ClientSession {
        ClientSession::new(SessionId(1))
    }

    #[test]
    fn test_new_session_is_in_login_without_name() {
        let s = session();
        assert_eq!(s.state(), ConnectionState::InLogin);
        assert!(s.name().is_none());
        assert!(!s.is_online());
    }

    #[test]
    fn test_go_online_sets_name_and_state() {
        let mut s = session();
        s.go_online("alice".into()).unwrap();
        assert!(s.is_online());
        assert_eq!(s.name(), Some("alice"));
    }

    #[test]
    fn test_go_online_twice_returns_invalid_transition() {
        let mut s = session();
        s.go_online("alice".into()).unwrap();
        let result = s.go_online("bob".into());
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                from: ConnectionState::Online,
                to: ConnectionState::Online,
            })
        ));
        assert_eq!(s.name(), Some("alice"));
    }

    #[test]
    fn test_kick_from_login_and_online_is_terminal() {
        let mut a = session();
        a.kick().unwrap();
        assert!(a.state().is_terminal());

        let mut b = session();
        b.go_online("bob1".into()).unwrap();
        b.kick().unwrap();
        assert_eq!(b.state(), ConnectionState::Kicked);
    }

    #[test]
    fn test_request_disconnect_from_login_is_allowed() {
        let mut s = session();
        s.request_disconnect().unwrap();
        assert_eq!(s.state(), ConnectionState::RequestedDisconnect);
    }

    #[test]
    fn test_terminal_state_cannot_be_left() {
        let mut s = session();
        s.request_disconnect().unwrap();
        assert!(s.kick().is_err());
        assert!(s.go_online("late".into()).is_err());
        assert_eq!(s.state(), ConnectionState::RequestedDisconnect);
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(9).to_string(), "S-9");
    }
}
