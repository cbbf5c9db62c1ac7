use std::sync::Arc;
use tokio::sync::broadcast;

use misty::config::EngineConfig;
use misty::{Engine, EngineError, Runner};

mod api;
mod demo;
mod message;

const CONFIG_PATH: &str = "engine_config.toml";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load engine configuration
    let config = match EngineConfig::load(CONFIG_PATH) {
        Ok(cfg) => {
            log::info!("[CONFIG] Loaded engine config from {}", CONFIG_PATH);
            cfg
        }
        Err(EngineError::Io(e)) => {
            log::warn!("[CONFIG] Could not read {}: {}. Writing defaults.", CONFIG_PATH, e);
            let default_config = EngineConfig::default();
            if let Err(e) = default_config.save(CONFIG_PATH) {
                log::warn!("[CONFIG] Could not write {}: {}", CONFIG_PATH, e);
            }
            default_config
        }
        Err(e) => {
            log::warn!("[CONFIG] Invalid {}: {}. Using defaults.", CONFIG_PATH, e);
            EngineConfig::default()
        }
    };

    let (tx, _rx) = broadcast::channel(64);

    let mut engine = match Engine::new(config.clone()) {
        Ok(engine) => engine
            .with_assets(Arc::new(demo::assets()))
            .with_audio(Arc::new(api::BroadcastAudio::new(tx.clone()))),
        Err(e) => {
            log::error!("[ENGINE] Failed to start: {}", e);
            std::process::exit(1);
        }
    };
    demo::populate(&mut engine);

    let state = api::AppState::new(tx.clone(), engine.input(), &config);
    let handle = match Runner::spawn(engine, api::BroadcastRenderer::new(tx)) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("[RUNNER] Failed to spawn simulation thread: {}", e);
            std::process::exit(1);
        }
    };

    let app = api::router(state, &config.server.assets_dir);

    let bind = config.server.bind.as_str();
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            log::error!("Address {} is already in use.", bind);
            log::error!("Please stop the existing server or change [server] bind in {}.", CONFIG_PATH);
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Failed to bind to {}: {}", bind, e);
            std::process::exit(1);
        }
    };
    log::info!("Server running on http://{}", bind);

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        log::error!("[WS] Server error: {}", e);
    }

    match tokio::task::spawn_blocking(move || handle.stop()).await {
        Ok(Some(engine)) => log::info!(
            "[RUNNER] Stopped after {} frames, {} objects live",
            engine.frame(),
            engine.object_count()
        ),
        _ => log::warn!("[RUNNER] Simulation did not stop cleanly"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
