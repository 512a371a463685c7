use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod process;
mod server;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Worker threads from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(config::AppState::new(&cfg));
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &cfg);

    server::start_server_loop(
        listener,
        Arc::clone(&state),
        active_connections,
        server::shutdown_signal(),
    )
    .await;

    if !state.store.is_empty().await {
        logger::log_info(&format!(
            "Discarding {} unsaved in-memory sheet(s)",
            state.store.len().await
        ));
    }

    // The dev server never outlives the backend
    match state.dev_server.stop().await {
        Ok(Some(status)) => logger::log_info(&format!("Dev server terminated ({status})")),
        Ok(None) => {}
        Err(e) => logger::log_error(&e.to_string()),
    }
    logger::log_info("Shutdown complete");
    Ok(())
}
