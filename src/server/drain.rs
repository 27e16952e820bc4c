// Shutdown drain module
// Waits for in-flight connections after the listener has been closed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How often the connection counter is sampled while draining
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until every active connection has finished or `grace` elapses.
///
/// Connection tasks decrement `conn_counter` when they finish, so the counter
/// reaching zero means nothing is in flight. Returns the number of
/// connections still open when the wait ended; those are abandoned when the
/// runtime shuts down.
pub async fn drain_connections(conn_counter: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let active = conn_counter.load(Ordering::SeqCst);
        if active == 0 {
            return 0;
        }

        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            () = tokio::time::sleep_until(deadline) => {
                return conn_counter.load(Ordering::SeqCst);
            }
        }
    }
}
