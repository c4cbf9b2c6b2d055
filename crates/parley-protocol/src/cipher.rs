//! Optional frame encryption.
//!
//! A [`Cipher`] transforms whole encoded frames after encoding and before
//! decoding. The server works unchanged with [`Plaintext`], which is what
//! it installs unless told otherwise. Key exchange is not part of this
//! layer: a cipher is configured once for the whole server.

use crate::ProtocolError;

/// Reversible transformation applied to every frame.
pub trait Cipher: Send + Sync + 'static {
    /// Transforms an encoded frame before it is sent.
    fn encrypt(&self, frame: Vec<u8>) -> Result<Vec<u8>, ProtocolError>;

    /// Reverses [`encrypt`](Cipher::encrypt) on a received frame.
    fn decrypt(&self, frame: Vec<u8>) -> Result<Vec<u8>, ProtocolError>;
}

/// The no-op cipher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plaintext;

impl Cipher for Plaintext {
    fn encrypt(&self, frame: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        Ok(frame)
    }

    fn decrypt(&self, frame: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        Ok(frame)
    }
}
