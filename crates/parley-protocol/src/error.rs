//! Error types for the protocol layer.
//!
//! Each Parley crate defines its own error enum. A `ProtocolError` always
//! means the problem is in turning packets into bytes or back, never in
//! networking or in the chat rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a packet into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a packet).
    ///
    /// Common causes: malformed JSON, missing fields, an unknown `type`
    /// tag, or a frame that was not produced by a Parley client at all.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The packet is invalid at the protocol level, e.g. an attempt to put
    /// the local-only [`Packet::Invalid`](crate::Packet::Invalid) sentinel
    /// on the wire.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The cipher rejected the frame.
    #[error("cipher failed: {0}")]
    Cipher(String),
}
