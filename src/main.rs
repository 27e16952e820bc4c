use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use asset_server::config::{AppState, Config};
use asset_server::error::StartupError;
use asset_server::logger;
use asset_server::server::{
    create_reusable_listener, start_server_loop, start_signal_handler, ServerLoopConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))?;
    Ok(())
}

async fn async_main(cfg: Config) -> Result<(), StartupError> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let state = Arc::new(AppState::new(&cfg));
    logger::log_server_start(&listener.local_addr()?, &state);

    let shutdown_signal = Arc::new(Notify::new());
    start_signal_handler(Arc::clone(&shutdown_signal))?;

    start_server_loop(
        listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            shutdown_signal,
            shutdown_timeout: Duration::from_secs(cfg.performance.shutdown_timeout),
        },
    )
    .await;

    Ok(())
}
