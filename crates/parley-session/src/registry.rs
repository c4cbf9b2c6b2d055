//! The roster of online sessions.
//!
//! `SessionRegistry` maps display names to the outbound queue of the
//! session that owns the name. It is NOT thread-safe by itself: it is
//! owned by a single task (the lobby actor) and every other task reaches
//! it through that task's channel. That single owner is what makes
//! "check the name, then insert it" one atomic step.

use std::collections::HashMap;

use parley_protocol::Packet;
use tokio::sync::mpsc;

use crate::{SessionError, SessionId, validate_name};

/// The sending half of a session's outbound queue.
///
/// Packets pushed here are written to the client, in order, by that
/// session's writer task.
pub type Outbound = mpsc::UnboundedSender<Packet>;

#[derive(Debug)]
struct Entry {
    id: SessionId,
    outbound: Outbound,
}

/// Online sessions, keyed by display name.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Entry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session under `name`.
    ///
    /// # Errors
    /// - [`SessionError::NameLength`] if the name is out of bounds
    /// - [`SessionError::NameInUse`] if another session holds the name
    pub fn register(
        &mut self,
        id: SessionId,
        name: &str,
        outbound: Outbound,
    ) -> Result<(), SessionError> {
        validate_name(name)?;
        if self.sessions.contains_key(name) {
            return Err(SessionError::NameInUse(name.to_string()));
        }
        self.sessions
            .insert(name.to_string(), Entry { id, outbound });
        tracing::debug!(%id, name, online = self.sessions.len(), "registered");
        Ok(())
    }

    /// Removes `name` if it is still held by session `id`.
    ///
    /// Returns whether an entry was removed. Calling it twice, or with the
    /// id of a session that no longer owns the name, is a no-op.
    pub fn unregister(&mut self, id: SessionId, name: &str) -> bool {
        match self.sessions.get(name) {
            Some(entry) if entry.id == id => {
                self.sessions.remove(name);
                tracing::debug!(%id, name, online = self.sessions.len(), "unregistered");
                true
            }
            _ => false,
        }
    }

    /// The session currently holding `name`.
    pub fn find(&self, name: &str) -> Option<SessionId> {
        self.sessions.get(name).map(|entry| entry.id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    /// Snapshot of online names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Queues `packet` for one session. Returns `false` if the name is not
    /// online or its writer has already gone away.
    pub fn send_to(&self, name: &str, packet: Packet) -> bool {
        self.sessions
            .get(name)
            .is_some_and(|entry| entry.outbound.send(packet).is_ok())
    }

    /// Queues `packet` for every online session except `except`.
    ///
    /// Returns how many queues accepted it.
    pub fn broadcast(&self, packet: &Packet, except: Option<&str>) -> usize {
        self.sessions
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != except)
            .filter(|(_, entry)| entry.outbound.send(packet.clone()).is_ok())
            .count()
    }

    /// Empties the roster, handing back every name and queue.
    pub fn drain(&mut self) -> Vec<(String, Outbound)> {
        self.sessions
            .drain()
            .map(|(name, entry)| (name, entry.outbound))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn queue() -> (Outbound, UnboundedReceiver<Packet>) {
        mpsc::unbounded_channel()
    }

    fn drained(rx: &mut UnboundedReceiver<Packet>) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(p) = rx.try_recv() {
            packets.push(p);
        }
        packets
    }

    // =====================================================================
    // register() / unregister()
    // =====================================================================

    #[test]
    fn test_register_new_name_succeeds() {
        let mut reg = SessionRegistry::new();
        let (tx, _rx) = queue();

        reg.register(SessionId(1), "alice", tx).unwrap();

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find("alice"), Some(SessionId(1)));
    }

    #[test]
    fn test_register_taken_name_returns_name_in_use() {
        let mut reg = SessionRegistry::new();
        let (a, _ra) = queue();
        let (b, _rb) = queue();
        reg.register(SessionId(1), "alice", a).unwrap();

        let result = reg.register(SessionId(2), "alice", b);

        assert!(matches!(result, Err(SessionError::NameInUse(n)) if n == "alice"));
        assert_eq!(reg.find("alice"), Some(SessionId(1)));
    }

    #[test]
    fn test_register_bad_name_is_not_inserted() {
        let mut reg = SessionRegistry::new();
        let (tx, _rx) = queue();

        let result = reg.register(SessionId(1), "al", tx);

        assert!(matches!(result, Err(SessionError::NameLength { .. })));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut reg = SessionRegistry::new();
        let (tx, _rx) = queue();
        reg.register(SessionId(1), "alice", tx).unwrap();

        assert!(reg.unregister(SessionId(1), "alice"));
        assert!(!reg.unregister(SessionId(1), "alice"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_stale_id_keeps_new_owner() {
        let mut reg = SessionRegistry::new();
        let (old, _ro) = queue();
        let (new, _rn) = queue();
        reg.register(SessionId(1), "alice", old).unwrap();
        reg.unregister(SessionId(1), "alice");
        reg.register(SessionId(2), "alice", new).unwrap();

        assert!(!reg.unregister(SessionId(1), "alice"));
        assert_eq!(reg.find("alice"), Some(SessionId(2)));
    }

    // =====================================================================
    // Delivery
    // =====================================================================

    #[test]
    fn test_broadcast_skips_excluded_name() {
        let mut reg = SessionRegistry::new();
        let (a, mut ra) = queue();
        let (b, mut rb) = queue();
        reg.register(SessionId(1), "alice", a).unwrap();
        reg.register(SessionId(2), "bobby", b).unwrap();

        let sent = reg.broadcast(&Packet::info("hello"), Some("alice"));

        assert_eq!(sent, 1);
        assert!(drained(&mut ra).is_empty());
        assert_eq!(drained(&mut rb), vec![Packet::info("hello")]);
    }

    #[test]
    fn test_broadcast_without_exclusion_reaches_everyone() {
        let mut reg = SessionRegistry::new();
        let (a, mut ra) = queue();
        let (b, mut rb) = queue();
        reg.register(SessionId(1), "alice", a).unwrap();
        reg.register(SessionId(2), "bobby", b).unwrap();

        assert_eq!(reg.broadcast(&Packet::Disconnect, None), 2);
        assert_eq!(drained(&mut ra).len(), 1);
        assert_eq!(drained(&mut rb).len(), 1);
    }

    #[test]
    fn test_send_to_closed_queue_returns_false() {
        let mut reg = SessionRegistry::new();
        let (tx, rx) = queue();
        reg.register(SessionId(1), "alice", tx).unwrap();
        drop(rx);

        assert!(!reg.send_to("alice", Packet::info("x")));
        assert!(!reg.send_to("nobody", Packet::info("x")));
    }

    #[test]
    fn test_names_sorted_and_drain_empties() {
        let mut reg = SessionRegistry::new();
        for (i, name) in ["carol", "alice", "bobby"].into_iter().enumerate() {
            let (tx, _rx) = queue();
            reg.register(SessionId(i as u64), name, tx).unwrap();
        }

        assert_eq!(reg.names(), vec!["alice", "bobby", "carol"]);
        assert_eq!(reg.drain().len(), 3);
        assert!(reg.is_empty());
    }
}
