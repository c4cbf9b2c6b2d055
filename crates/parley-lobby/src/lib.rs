//! The chat lobby for Parley.
//!
//! One lobby actor task owns the roster of online sessions and applies
//! the routing rules to every packet an online client sends.
//!
//! # Key types
//!
//! - [`LobbyHandle`]: send commands to the running lobby actor
//! - [`dispatch`]: pure routing rules for one packet
//! - [`LobbyConfig`]: capacity and channel settings
//! - [`LobbyError`]: why a login failed

mod config;
mod dispatch;
mod error;
mod lobby;

pub use config::LobbyConfig;
pub use dispatch::{
    Dispatch, Recipient, SELF_MESSAGE, Verdict, dispatch, not_delivered,
};
pub use error::{LobbyError, too_many_clients};
pub use lobby::{
    LobbyHandle, LobbyInfo, SHUTDOWN_REASON, spawn_lobby, welcome,
};
