//! Graceful shutdown: the termination signal and the teardown sequence.

use std::sync::Arc;

use parley_lobby::SHUTDOWN_REASON;
use parley_protocol::{Cipher, Codec};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::server::ServerState;

/// Completes on Ctrl-C, or SIGTERM on Unix.
///
/// If a handler cannot be installed, that source is ignored rather than
/// firing immediately.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

/// Tears the server down once the listener has stopped.
///
/// 1. The lobby kicks every online session and stops.
/// 2. The shutdown flag wakes sessions still logging in or reading.
/// 3. Session tasks get `shutdown_grace` to flush and close; the rest
///    are aborted.
pub(crate) async fn coordinate<C: Codec, K: Cipher>(
    state: &Arc<ServerState<C, K>>,
    mut sessions: JoinSet<()>,
    flag: watch::Sender<bool>,
) {
    match state.lobby.shutdown(SHUTDOWN_REASON).await {
        Ok(kicked) => tracing::info!(kicked, "kicked online clients"),
        Err(e) => tracing::warn!(error = %e, "lobby already stopped"),
    }
    flag.send_replace(true);

    let grace = state.config.shutdown_grace;
    let drained = tokio::time::timeout(grace, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            remaining = sessions.len(),
            "sessions did not close in time, aborting"
        );
        sessions.abort_all();
        while sessions.join_next().await.is_some() {}
    }

    tracing::info!(counters = %state.counters.snapshot(), "server stopped");
}
