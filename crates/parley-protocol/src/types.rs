//! The chat packets that travel on the wire.
//!
//! Every frame a client or the server sends is exactly one [`Packet`].
//! The enum is closed: adding a variant is a compile-time-checked change
//! for every `match` in the server.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roster updates
// ---------------------------------------------------------------------------

/// Whether a user arrived or left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Connected,
    Disconnected,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// The payload of a [`Packet::UserList`].
///
/// A client receives one `Full` snapshot right after logging in and a
/// `Delta` for every later arrival or departure. Externally tagged, so in
/// JSON this reads `{"Full":{"names":[..]}}` or
/// `{"Delta":{"name":"bob","kind":"Connected"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserListUpdate {
    /// Every name currently online, including the receiver's own.
    Full { names: Vec<String> },

    /// One user came online or went away.
    Delta { name: String, kind: Presence },
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A single chat protocol message.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "GroupMessage", "text": "hi", "sender": "alice" }`
/// which is easy to build and inspect from a JavaScript client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    /// Client → Server: first packet of a session, asks for a display name.
    Connect { name: String },

    /// Either direction: the client wants to leave, or the server
    /// acknowledges that it is letting the client go.
    Disconnect,

    /// A message for everyone in the chat room.
    ///
    /// `sender` is overwritten by the server with the registered name of
    /// the session that sent it.
    GroupMessage { text: String, sender: String },

    /// A message for one named user. The server echoes it to the sender
    /// once it has been delivered.
    PrivateMessage {
        text: String,
        sender: String,
        receiver: String,
    },

    /// Server → Client: you are being removed, and why.
    Kick { reason: String },

    /// Server → Client: a human-readable notice.
    Info { text: String },

    /// Server → Client: roster snapshot or change.
    UserList { update: UserListUpdate },

    /// Local sentinel for a frame that could not be decoded.
    ///
    /// Never serialized and never accepted from the wire: a frame whose
    /// `type` is `"Invalid"` is itself a decode failure.
    #[serde(skip)]
    Invalid,
}

impl Packet {
    /// Builds an [`Info`](Packet::Info) packet.
    pub fn info(text: impl Into<String>) -> Self {
        Self::Info { text: text.into() }
    }

    /// Builds a [`Kick`](Packet::Kick) packet.
    pub fn kick(reason: impl Into<String>) -> Self {
        Self::Kick {
            reason: reason.into(),
        }
    }

    /// Builds a [`UserList`](Packet::UserList) carrying a full snapshot.
    pub fn full_roster(names: Vec<String>) -> Self {
        Self::UserList {
            update: UserListUpdate::Full { names },
        }
    }

    /// Builds a [`UserList`](Packet::UserList) carrying a single change.
    pub fn presence(name: impl Into<String>, kind: Presence) -> Self {
        Self::UserList {
            update: UserListUpdate::Delta {
                name: name.into(),
                kind,
            },
        }
    }

    /// The variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "Connect",
            Self::Disconnect => "Disconnect",
            Self::GroupMessage { .. } => "GroupMessage",
            Self::PrivateMessage { .. } => "PrivateMessage",
            Self::Kick { .. } => "Kick",
            Self::Info { .. } => "Info",
            Self::UserList { .. } => "UserList",
            Self::Invalid => "Invalid",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
