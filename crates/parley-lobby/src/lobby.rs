//! Lobby actor: the single task that owns the roster.
//!
//! Every login, logout, and routed packet is a command on the actor's
//! channel, so they are applied one at a time. A broadcast therefore never
//! sees a half-registered session, and two clients asking for the same
//! name are decided in arrival order.

use std::sync::Arc;

use parley_protocol::{Packet, Presence};
use parley_session::{
    Counter, Counters, Outbound, SessionId, SessionRegistry, validate_name,
};
use tokio::sync::{mpsc, oneshot};

use crate::{LobbyConfig, LobbyError, Recipient, Verdict, dispatch};

/// Kick reason sent to everyone when the server stops.
pub const SHUTDOWN_REASON: &str = "server is going down";

/// Greeting sent to a client right after it logs in.
pub fn welcome(name: &str) -> String {
    format!("Welcome \"{name}\" to our chat room.")
}

/// Commands sent to the lobby actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel: the caller
/// sends a command and waits for the answer on it.
pub(crate) enum LobbyCommand {
    /// Register a session under a name.
    Join {
        id: SessionId,
        name: String,
        outbound: Outbound,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Remove a session. Replies whether it was still registered.
    Leave {
        id: SessionId,
        name: String,
        reply: oneshot::Sender<bool>,
    },

    /// Route a packet from an online session.
    Route {
        id: SessionId,
        sender: String,
        packet: Packet,
        reply: oneshot::Sender<Verdict>,
    },

    /// Request counts and limits.
    GetInfo { reply: oneshot::Sender<LobbyInfo> },

    /// Request the sorted list of online names.
    Roster { reply: oneshot::Sender<Vec<String>> },

    /// Kick everyone and stop. Replies with the number kicked.
    Shutdown {
        reason: String,
        reply: oneshot::Sender<usize>,
    },
}

/// A snapshot of lobby metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyInfo {
    /// Sessions currently online.
    pub online: usize,
    /// Configured limit, 0 for unlimited.
    pub max_clients: usize,
}

impl LobbyInfo {
    /// `true` if no further client may log in.
    ///
    /// This is the one capacity rule: the accept loop asks it to decide
    /// between a session and a rejection, and the actor asks it again at
    /// login.
    pub fn is_full(&self) -> bool {
        self.max_clients != 0 && self.online >= self.max_clients
    }
}

/// Handle to the running lobby actor.
///
/// Cheap to clone; every connection task holds one.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    /// Asks to log `name` in for session `id`.
    ///
    /// On success the session is online, everyone else has been told,
    /// and the roster and welcome are queued on `outbound`.
    pub async fn join(
        &self,
        id: SessionId,
        name: String,
        outbound: Outbound,
    ) -> Result<(), LobbyError> {
        self.request(|reply| LobbyCommand::Join {
            id,
            name,
            outbound,
            reply,
        })
        .await?
    }

    /// Takes session `id` off the roster. Returns `false` if it was not on
    /// it anymore.
    pub async fn leave(
        &self,
        id: SessionId,
        name: String,
    ) -> Result<bool, LobbyError> {
        self.request(|reply| LobbyCommand::Leave { id, name, reply })
            .await
    }

    /// Routes a packet from session `id`, logged in as `sender`.
    ///
    /// Any verdict other than [`Verdict::Continue`] means the session has
    /// already been taken off the roster.
    pub async fn route(
        &self,
        id: SessionId,
        sender: String,
        packet: Packet,
    ) -> Result<Verdict, LobbyError> {
        self.request(|reply| LobbyCommand::Route {
            id,
            sender,
            packet,
            reply,
        })
        .await
    }

    /// Requests the current lobby info.
    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        self.request(|reply| LobbyCommand::GetInfo { reply }).await
    }

    /// Requests the names currently online, sorted.
    pub async fn roster(&self) -> Result<Vec<String>, LobbyError> {
        self.request(|reply| LobbyCommand::Roster { reply }).await
    }

    /// Kicks every online session with `reason` and stops the actor.
    ///
    /// Returns how many sessions were kicked.
    pub async fn shutdown(
        &self,
        reason: impl Into<String>,
    ) -> Result<usize, LobbyError> {
        let reason = reason.into();
        self.request(|reply| LobbyCommand::Shutdown { reason, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> LobbyCommand,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| LobbyError::Unavailable)?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }
}

/// The internal actor state. Runs inside a Tokio task.
///
/// The actor is the only owner of the [`SessionRegistry`]. Nothing else
/// can reach the map, so it needs no lock: every login, logout, routed
/// packet and shutdown is a [`LobbyCommand`] taken off one channel and
/// applied to completion before the next is looked at.
///
/// That ordering is what the chat guarantees rest on:
///
/// - A name check and the registration that follows it are one command,
///   so two clients racing for the same name cannot both win.
/// - A session that leaves is unregistered and announced in the same
///   command, so nobody ever sees a `Delta` for a user still listed, or
///   gets a message queued behind a departed user's farewell.
/// - Packets are pushed onto each recipient's outbound queue in the order
///   the actor handles them, and each queue has a single writer, so one
///   sender's messages reach a given recipient in the order they were sent.
///
/// The actor never awaits on a client. Outbound queues are unbounded, so
/// a slow reader costs memory in its own queue but never stalls routing
/// for anyone else.
struct LobbyActor {
    config: LobbyConfig,
    registry: SessionRegistry,
    counters: Arc<Counters>,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::debug!(max_clients = self.config.max_clients, "lobby actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                LobbyCommand::Join {
                    id,
                    name,
                    outbound,
                    reply,
                } => {
                    let result = self.handle_join(id, name, outbound);
                    let _ = reply.send(result);
                }
                LobbyCommand::Leave { id, name, reply } => {
                    let _ = reply.send(self.handle_leave(id, &name));
                }
                LobbyCommand::Route {
                    id,
                    sender,
                    packet,
                    reply,
                } => {
                    let _ = reply.send(self.handle_route(id, &sender, packet));
                }
                LobbyCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                LobbyCommand::Roster { reply } => {
                    let _ = reply.send(self.registry.names());
                }
                LobbyCommand::Shutdown { reason, reply } => {
                    let kicked = self.handle_shutdown(&reason);
                    let _ = reply.send(kicked);
                    break;
                }
            }
        }

        tracing::debug!("lobby actor stopped");
    }

    fn handle_join(
        &mut self,
        id: SessionId,
        name: String,
        outbound: Outbound,
    ) -> Result<(), LobbyError> {
        validate_name(&name)?;
        if self.info().is_full() {
            // Raced past the accept-time check while others logged in.
            self.counters.increment(Counter::Rejections);
            return Err(LobbyError::Full);
        }
        self.registry.register(id, &name, outbound)?;
        self.counters.increment(Counter::Logins);

        let roster = Packet::full_roster(self.registry.names());
        self.deliver(vec![
            (
                Recipient::AllExcept(name.clone()),
                Packet::presence(&name, Presence::Connected),
            ),
            (Recipient::Session(name.clone()), roster),
            (Recipient::Session(name.clone()), Packet::info(welcome(&name))),
        ]);

        tracing::info!(%id, name, online = self.registry.len(), "user joined");
        Ok(())
    }

    fn handle_leave(&mut self, id: SessionId, name: &str) -> bool {
        if !self.registry.unregister(id, name) {
            return false;
        }
        self.counters.increment(Counter::Disconnects);
        self.registry
            .broadcast(&Packet::presence(name, Presence::Disconnected), None);
        tracing::info!(%id, name, online = self.registry.len(), "user left");
        true
    }

    fn handle_route(
        &mut self,
        id: SessionId,
        sender: &str,
        packet: Packet,
    ) -> Verdict {
        if self.registry.find(sender) != Some(id) {
            tracing::warn!(%id, sender, "packet from a session not on the roster");
            return Verdict::Disconnect;
        }

        let outcome = dispatch(sender, packet, &self.registry, &self.counters);
        self.deliver(outcome.deliveries);

        // Take the sender off the roster before anything else is routed,
        // so nothing is queued behind its farewell packet.
        if outcome.verdict != Verdict::Continue {
            self.handle_leave(id, sender);
        }
        outcome.verdict
    }

    /// Pushes each packet onto its recipients' outbound queues, in order.
    fn deliver(&self, deliveries: Vec<(Recipient, Packet)>) {
        for (recipient, packet) in deliveries {
            match recipient {
                Recipient::All => {
                    self.registry.broadcast(&packet, None);
                }
                Recipient::Session(name) => {
                    self.registry.send_to(&name, packet);
                }
                Recipient::AllExcept(name) => {
                    self.registry.broadcast(&packet, Some(&name));
                }
            }
        }
    }

    fn handle_shutdown(&mut self, reason: &str) -> usize {
        let sessions = self.registry.drain();
        let kick = Packet::kick(reason);
        for (_, outbound) in &sessions {
            let _ = outbound.send(kick.clone());
        }
        self.counters
            .add(Counter::Disconnects, sessions.len() as u64);
        tracing::info!(kicked = sessions.len(), reason, "lobby shutting down");
        sessions.len()
    }

    fn info(&self) -> LobbyInfo {
        LobbyInfo {
            online: self.registry.len(),
            max_clients: self.config.max_clients,
        }
    }
}

/// Spawns the lobby actor task and returns a handle to communicate with it.
///
/// `config.channel_size` bounds the command channel; callers wait when it
/// is full.
pub fn spawn_lobby(config: LobbyConfig, counters: Arc<Counters>) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = LobbyActor {
        config,
        registry: SessionRegistry::new(),
        counters,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    LobbyHandle { sender: tx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_full_unlimited_never_full() {
        let info = LobbyInfo {
            online: 10_000,
            max_clients: 0,
        };
        assert!(!info.is_full());
    }

    #[test]
    fn test_is_full_at_limit() {
        let below = LobbyInfo {
            online: 1,
            max_clients: 2,
        };
        let at = LobbyInfo {
            online: 2,
            max_clients: 2,
        };
        assert!(!below.is_full());
        assert!(at.is_full());
    }
}
