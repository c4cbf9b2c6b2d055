//! Wire protocol for Parley.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Types** ([`Packet`], [`UserListUpdate`], [`Presence`]): the
//!   messages that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how packets are
//!   converted to/from bytes.
//! - **Cipher** ([`Cipher`] trait, [`Plaintext`]): optional frame
//!   encryption layered on top of the codec.
//! - **Wire** ([`Wire`]): the encode/decode contract the server uses,
//!   where decoding never fails and bad input becomes [`Packet::Invalid`].
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (who is online). It doesn't know about connections or the roster.
//!
//! ```text
//! Transport (frames) → Protocol (Packet) → Session / Lobby
//! ```

mod cipher;
mod codec;
mod error;
mod types;
mod wire;

pub use cipher::{Cipher, Plaintext};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Packet, Presence, UserListUpdate};
pub use wire::Wire;
