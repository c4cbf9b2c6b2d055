//! The encode/decode contract between a connection and the chat server.
//!
//! [`Wire`] composes a [`Codec`] with a [`Cipher`]:
//!
//! ```text
//! Packet ──codec──► bytes ──encrypt──► frame      (encode)
//! frame ──decrypt──► bytes ──codec──► Packet      (decode)
//! ```
//!
//! Decoding is total: any failure along the way yields
//! [`Packet::Invalid`], so the session layer handles bad input as an
//! ordinary packet instead of an error path.

use crate::{Cipher, Codec, Packet, ProtocolError};

/// Codec and cipher bundled for a whole server.
///
/// One `Wire` is built when the server starts and shared by every
/// connection task, which is why both halves must be `Send + Sync`. It is
/// the only place where packets become bytes, so the rest of the server
/// never names a format or a cipher.
///
/// ## Why two decode methods
///
/// - [`decode`](Self::decode) is what the session loop calls. It cannot
///   fail: a truncated frame, a cipher error or a JSON object with an
///   unknown `type` all come back as [`Packet::Invalid`], which the
///   routing rules answer with a security-breach kick. Bad input is just
///   another packet.
/// - [`try_decode`](Self::try_decode) returns the underlying
///   [`ProtocolError`] for callers that want to log why a frame was
///   rejected before treating it as `Invalid`.
///
/// Encoding, on the other hand, can fail loudly: the server only encodes
/// packets it built itself, so an error there is a bug worth logging, and
/// `Invalid` is refused outright because it must never reach the wire.
#[derive(Debug, Clone, Default)]
pub struct Wire<C, K> {
    codec: C,
    cipher: K,
}

impl<C: Codec, K: Cipher> Wire<C, K> {
    pub fn new(codec: C, cipher: K) -> Self {
        Self { codec, cipher }
    }

    /// Turns a packet into a frame ready for the transport.
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` for [`Packet::Invalid`], otherwise
    /// whatever the codec or cipher report.
    pub fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        if matches!(packet, Packet::Invalid) {
            return Err(ProtocolError::InvalidMessage(
                "the Invalid sentinel is never sent".into(),
            ));
        }
        let bytes = self.codec.encode(packet)?;
        self.cipher.encrypt(bytes)
    }

    /// Decodes a frame, reporting why it failed.
    pub fn try_decode(&self, frame: &[u8]) -> Result<Packet, ProtocolError> {
        let bytes = self.cipher.decrypt(frame.to_vec())?;
        self.codec.decode(&bytes)
    }

    /// Decodes a frame, mapping every failure to [`Packet::Invalid`].
    pub fn decode(&self, frame: &[u8]) -> Packet {
        self.try_decode(frame).unwrap_or(Packet::Invalid)
    }
}
