// Server loop module
// Accepts connections until shutdown is requested, then drains

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use super::drain::drain_connections;
use crate::config::AppState;
use crate::logger;

/// Configuration for server loop behavior
pub struct ServerLoopConfig {
    /// Notified once to stop accepting and begin the drain
    pub shutdown_signal: Arc<Notify>,
    /// How long in-flight connections get to finish
    pub shutdown_timeout: Duration,
}

/// Run the accept loop until `shutdown_signal` fires.
///
/// After the signal the listener is closed, open connections are told to
/// finish their current request, and the loop waits up to
/// `shutdown_timeout` for them. Returns the number of connections still
/// open when it gave up.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) -> usize {
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            drain_rx.clone(),
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = config.shutdown_signal.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));

    // Receivers only disappear with their connections
    let _ = drain_tx.send(true);

    let remaining = drain_connections(&active_connections, config.shutdown_timeout).await;
    logger::log_shutdown_complete(remaining);
    remaining
}
