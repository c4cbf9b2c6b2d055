//! # Parley
//!
//! Real-time text chat server.
//!
//! Clients connect over WebSocket, log in with a display name and then
//! chat with everyone online or privately with one user. The server
//! keeps every client's user list current, turns clients away when it
//! is full, and kicks everyone with a reason when it shuts down.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn start() -> Result<(), ParleyError> {
//! let _log = parley::logging::init(&LogConfig::default())?;
//!
//! let server = ParleyServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .max_clients(100)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logging;
mod rejection;
mod server;
mod shutdown;

pub use config::{DEFAULT_PORT, LogConfig, ServerConfig};
pub use error::ParleyError;
pub use handler::IDLE_REASON;
pub use logging::LogGuard;
pub use server::{ParleyServer, ParleyServerBuilder};
pub use shutdown::termination_signal;

/// Everything needed to start a server and inspect it.
pub mod prelude {
    pub use crate::{
        IDLE_REASON, LogConfig, ParleyError, ParleyServer,
        ParleyServerBuilder, ServerConfig,
    };
    pub use parley_lobby::{LobbyHandle, LobbyInfo, SHUTDOWN_REASON};
    pub use parley_protocol::{Packet, Presence, UserListUpdate};
    pub use parley_session::{Counter, CounterSnapshot, Counters};
}
