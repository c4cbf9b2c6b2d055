//! Client sessions for Parley.
//!
//! This crate holds the pieces of chat state that do not touch the
//! network:
//!
//! 1. **Lifecycle**: each connection's [`ClientSession`] state machine
//! 2. **Names**: who may call themselves what ([`validate_name`])
//! 3. **Roster**: who is online right now ([`SessionRegistry`])
//! 4. **Counters**: what happened since start-up ([`Counters`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)  ← owns the registry, routes packets between sessions
//!     ↕
//! Session Layer (this crate)  ← names, states, roster, counters
//!     ↕
//! Protocol Layer (below)  ← provides Packet
//! ```

mod counters;
mod error;
mod name;
mod registry;
mod state;

pub use counters::{Counter, CounterSnapshot, Counters};
pub use error::{SECURITY_BREACH, SessionError};
pub use name::{MAX_NAME_LEN, MIN_NAME_LEN, validate_name};
pub use registry::{Outbound, SessionRegistry};
pub use state::{ClientSession, ConnectionState, SessionId};
