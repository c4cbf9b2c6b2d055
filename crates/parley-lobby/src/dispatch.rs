//! Packet routing for online sessions.
//!
//! [`dispatch`] is a pure function: given who sent a packet and the
//! current roster, it decides which packets go to whom and whether the
//! sender may stay. It never touches a socket. The lobby actor applies
//! the result.

use parley_protocol::Packet;
use parley_session::{Counter, Counters, SECURITY_BREACH, SessionRegistry};

/// Who receives a routed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every online session.
    All,
    /// One session, by name.
    Session(String),
    /// Every online session except one, e.g. an arrival announcement
    /// that skips the new user.
    AllExcept(String),
}

/// What happens to the sender after its packet was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Stay online.
    Continue,
    /// The sender asked to leave.
    Disconnect,
    /// The sender broke the protocol and is removed with this reason.
    Kick(String),
}

/// The outcome of routing one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub deliveries: Vec<(Recipient, Packet)>,
    pub verdict: Verdict,
}

impl Dispatch {
    fn cont(deliveries: Vec<(Recipient, Packet)>) -> Self {
        Self {
            deliveries,
            verdict: Verdict::Continue,
        }
    }

    fn reply(sender: &str, packet: Packet) -> Vec<(Recipient, Packet)> {
        vec![(Recipient::Session(sender.to_string()), packet)]
    }

    fn kick(sender: &str, reason: &str) -> Self {
        Self {
            deliveries: Self::reply(sender, Packet::kick(reason)),
            verdict: Verdict::Kick(reason.to_string()),
        }
    }
}

/// Info text for a private message addressed to its own sender.
pub const SELF_MESSAGE: &str = "You can't send private messages to yourself";

/// Info text for a private message whose receiver is not online.
pub fn not_delivered(receiver: &str) -> String {
    format!("Message could not be delivered, reason: \"{receiver}\" is not online")
}

/// Routes `packet`, sent by the online session named `sender`.
///
/// The `sender` field of chat packets is replaced with `sender`, so a
/// client cannot speak under someone else's name.
pub fn dispatch(
    sender: &str,
    packet: Packet,
    registry: &SessionRegistry,
    counters: &Counters,
) -> Dispatch {
    match packet {
        Packet::GroupMessage { text, .. } => {
            counters.increment(Counter::GroupMessages);
            Dispatch::cont(vec![(
                Recipient::All,
                Packet::GroupMessage {
                    text,
                    sender: sender.to_string(),
                },
            )])
        }

        Packet::PrivateMessage { text, receiver, .. } => {
            counters.increment(Counter::PrivateMessages);

            if receiver == sender {
                return Dispatch::cont(Dispatch::reply(
                    sender,
                    Packet::info(SELF_MESSAGE),
                ));
            }
            if !registry.contains(&receiver) {
                counters.increment(Counter::PrivateMessagesFailed);
                return Dispatch::cont(Dispatch::reply(
                    sender,
                    Packet::info(not_delivered(&receiver)),
                ));
            }

            let message = Packet::PrivateMessage {
                text,
                sender: sender.to_string(),
                receiver: receiver.clone(),
            };
            Dispatch::cont(vec![
                (Recipient::Session(receiver), message.clone()),
                (Recipient::Session(sender.to_string()), message),
            ])
        }

        Packet::Disconnect => Dispatch {
            deliveries: Dispatch::reply(sender, Packet::Disconnect),
            verdict: Verdict::Disconnect,
        },

        Packet::Invalid => Dispatch::kick(sender, SECURITY_BREACH),

        // Server-to-client packets and a second login have no business
        // arriving from an online client.
        Packet::Connect { .. }
        | Packet::Kick { .. }
        | Packet::Info { .. }
        | Packet::UserList { .. } => {
            tracing::debug!(sender, kind = packet.kind(), "protocol violation");
            Dispatch::kick(sender, SECURITY_BREACH)
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use parley_protocol::Presence;
    use parley_session::{Outbound, SessionId};
    use tokio::sync::mpsc;

    use super::*;

    /// A registry holding the given names. Receivers are dropped; the
    /// dispatcher only reads the roster.
    fn roster(names: &[&str]) -> SessionRegistry {
        let mut registry = SessionRegistry::new();
        for (i, name) in names.iter().enumerate() {
            let (tx, _rx): (Outbound, _) = mpsc::unbounded_channel();
            registry.register(SessionId(i as u64), name, tx).unwrap();
        }
        registry
    }

    fn to(name: &str) -> Recipient {
        Recipient::Session(name.to_string())
    }

    // =====================================================================
    // GroupMessage
    // =====================================================================

    #[test]
    fn test_group_message_goes_to_all_with_stamped_sender() {
        let counters = Counters::new();
        let packet = Packet::GroupMessage {
            text: "hi".into(),
            sender: "mallory".into(),
        };

        let out = dispatch("alice", packet, &roster(&["alice", "bobby"]), &counters);

        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(
            out.deliveries,
            vec![(
                Recipient::All,
                Packet::GroupMessage {
                    text: "hi".into(),
                    sender: "alice".into()
                }
            )]
        );
        assert_eq!(counters.get(Counter::GroupMessages), 1);
    }

    // =====================================================================
    // PrivateMessage
    // =====================================================================

    #[test]
    fn test_private_message_delivered_and_echoed() {
        let counters = Counters::new();
        let packet = Packet::PrivateMessage {
            text: "hey".into(),
            sender: "alice".into(),
            receiver: "bobby".into(),
        };

        let out = dispatch("alice", packet.clone(), &roster(&["alice", "bobby"]), &counters);

        assert_eq!(
            out.deliveries,
            vec![(to("bobby"), packet.clone()), (to("alice"), packet)]
        );
        assert_eq!(counters.get(Counter::PrivateMessages), 1);
        assert_eq!(counters.get(Counter::PrivateMessagesFailed), 0);
    }

    #[test]
    fn test_private_message_to_offline_user_informs_sender_only() {
        let counters = Counters::new();
        let packet = Packet::PrivateMessage {
            text: "hey".into(),
            sender: "alice".into(),
            receiver: "carol".into(),
        };

        let out = dispatch("alice", packet, &roster(&["alice", "bobby"]), &counters);

        assert_eq!(out.verdict, Verdict::Continue);
        assert_eq!(
            out.deliveries,
            vec![(
                to("alice"),
                Packet::info(
                    "Message could not be delivered, reason: \"carol\" is not online"
                )
            )]
        );
        assert_eq!(counters.get(Counter::PrivateMessages), 1);
        assert_eq!(counters.get(Counter::PrivateMessagesFailed), 1);
    }

    #[test]
    fn test_private_message_to_self_is_not_a_failure() {
        let counters = Counters::new();
        let packet = Packet::PrivateMessage {
            text: "me".into(),
            sender: "alice".into(),
            receiver: "alice".into(),
        };

        let out = dispatch("alice", packet, &roster(&["alice"]), &counters);

        assert_eq!(out.deliveries, vec![(to("alice"), Packet::info(SELF_MESSAGE))]);
        assert_eq!(counters.get(Counter::PrivateMessages), 1);
        assert_eq!(counters.get(Counter::PrivateMessagesFailed), 0);
    }

    #[test]
    fn test_private_message_sender_field_is_overwritten() {
        let counters = Counters::new();
        let packet = Packet::PrivateMessage {
            text: "x".into(),
            sender: "bobby".into(),
            receiver: "bobby".into(),
        };

        // alice forges bobby as sender; the message is routed as alice's.
        let out = dispatch("alice", packet, &roster(&["alice", "bobby"]), &counters);

        let (recipient, delivered) = &out.deliveries[0];
        assert_eq!(recipient, &to("bobby"));
        assert!(matches!(delivered, Packet::PrivateMessage { sender, .. } if sender == "alice"));
    }

    // =====================================================================
    // Leaving and protocol violations
    // =====================================================================

    #[test]
    fn test_disconnect_is_acknowledged() {
        let out = dispatch("alice", Packet::Disconnect, &roster(&["alice"]), &Counters::new());

        assert_eq!(out.verdict, Verdict::Disconnect);
        assert_eq!(out.deliveries, vec![(to("alice"), Packet::Disconnect)]);
    }

    #[test]
    fn test_invalid_packet_kicks_sender() {
        let out = dispatch("alice", Packet::Invalid, &roster(&["alice"]), &Counters::new());

        assert_eq!(out.verdict, Verdict::Kick(SECURITY_BREACH.into()));
        assert_eq!(out.deliveries, vec![(to("alice"), Packet::kick(SECURITY_BREACH))]);
    }

    #[test]
    fn test_server_only_packets_from_client_kick_sender() {
        let registry = roster(&["alice"]);
        let forbidden = [
            Packet::Connect { name: "again".into() },
            Packet::kick("you"),
            Packet::info("fake"),
            Packet::presence("ghost", Presence::Connected),
        ];

        for packet in forbidden {
            let out = dispatch("alice", packet, &registry, &Counters::new());
            assert!(matches!(out.verdict, Verdict::Kick(_)));
        }
    }
}
