//! Byte formats for packets.
//!
//! A codec (coder/decoder) turns a serde value into the bytes of one frame
//! and back. The server is generic over [`Codec`], so the frame format can
//! change without touching session or routing code: swapping JSON for a
//! binary format means one new implementation here and a different type
//! parameter on the server builder.
//!
//! The codec knows nothing about encryption or about `Packet::Invalid`.
//! Both are layered on top by [`Wire`](crate::Wire).

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns serde values into frame bytes and back.
///
/// One instance is shared by every connection task, hence `Send + Sync`.
pub trait Codec: Send + Sync + 'static {
    /// Fails with [`ProtocolError::Encode`] if the format cannot represent
    /// `value`.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Fails with [`ProtocolError::Decode`] on truncated, malformed or
    /// mistyped input.
    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError>;
}

/// Compact JSON, one object per frame.
///
/// Enabled by the default `json` feature.
///
/// ```rust
/// use parley_protocol::{Codec, JsonCodec, Packet};
///
/// let hello = Packet::Connect { name: "alice".into() };
/// let frame = JsonCodec.encode(&hello).unwrap();
/// assert_eq!(frame, br#"{"type":"Connect","name":"alice"}"#);
///
/// let back: Packet = JsonCodec.decode(&frame).unwrap();
/// assert_eq!(back, hello);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(frame).map_err(ProtocolError::Decode)
    }
}
