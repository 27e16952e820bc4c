// Server module entry
// Listener setup, connection handling, accept loop and graceful shutdown

pub mod connection;
pub mod drain;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the file is mounted as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::{start_server_loop, ServerLoopConfig};
pub use signal::start_signal_handler;
