//! Property test: every packet that can be put on the wire comes back
//! unchanged.

#![cfg(feature = "json")]

use parley_protocol::{
    JsonCodec, Packet, Plaintext, Presence, UserListUpdate, Wire,
};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{4,15}"
}

fn text() -> impl Strategy<Value = String> {
    // Arbitrary unicode, including quotes and escapes JSON must handle.
    any::<String>()
}

fn presence() -> impl Strategy<Value = Presence> {
    prop_oneof![Just(Presence::Connected), Just(Presence::Disconnected)]
}

fn user_list() -> impl Strategy<Value = UserListUpdate> {
    prop_oneof![
        prop::collection::vec(name(), 0..8)
            .prop_map(|names| UserListUpdate::Full { names }),
        (name(), presence())
            .prop_map(|(name, kind)| UserListUpdate::Delta { name, kind }),
    ]
}

fn packet() -> impl Strategy<Value = Packet> {
    prop_oneof![
        name().prop_map(|name| Packet::Connect { name }),
        Just(Packet::Disconnect),
        (text(), name())
            .prop_map(|(text, sender)| Packet::GroupMessage { text, sender }),
        (text(), name(), name()).prop_map(|(text, sender, receiver)| {
            Packet::PrivateMessage {
                text,
                sender,
                receiver,
            }
        }),
        text().prop_map(|reason| Packet::Kick { reason }),
        text().prop_map(|text| Packet::Info { text }),
        user_list().prop_map(|update| Packet::UserList { update }),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(p in packet()) {
        let wire = Wire::new(JsonCodec, Plaintext);
        let frame = wire.encode(&p).unwrap();
        prop_assert_eq!(wire.decode(&frame), p);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let wire = Wire::new(JsonCodec, Plaintext);
        let _ = wire.decode(&bytes);
    }
}
