// Connection handling module
// Accepts a single TCP connection and serves it with the request pipeline

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `draining` - Flips to `true` once the server starts shutting down
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    draining: watch::Receiver<bool>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        draining,
    );
}

/// Serve one connection on its own task.
///
/// Header reads are bounded by `read_timeout`. Once the connection has been
/// open for `keep_alive_timeout`, or the drain flag flips, hyper finishes the
/// in-flight response and closes instead of waiting for another request.
/// A response that is still being written is never cut off.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    mut draining: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let perf = &state.config.performance;
        let keep_alive = perf.keep_alive_timeout > 0;
        let keep_alive_window = Duration::from_secs(perf.keep_alive_timeout);

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(keep_alive)
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(perf.read_timeout));

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), peer_addr)
            }),
        );

        let mut conn = std::pin::pin!(conn);
        let window = tokio::time::sleep(keep_alive_window);
        tokio::pin!(window);

        let mut closing = *draining.borrow();
        if closing {
            conn.as_mut().graceful_shutdown();
        }

        let served = loop {
            tokio::select! {
                res = conn.as_mut() => break res,
                _ = draining.changed(), if !closing => {
                    closing = true;
                    conn.as_mut().graceful_shutdown();
                }
                () = &mut window, if keep_alive && !closing => {
                    closing = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        };

        match served {
            Ok(()) => {}
            Err(err) if err.is_timeout() => {
                logger::log_debug(&format!(
                    "Connection from {peer_addr} timed out reading request headers"
                ));
            }
            Err(err) => logger::log_connection_error(&err),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
