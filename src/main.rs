mod config;
mod db;
mod docs;
mod fanout;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod utils;
mod websocket;

use config::Config;
use db::ChatStore;
use routes::create_app;
use state::AppState;
use std::panic;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "chatflow_broadcast=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    info!(
        "Environment: {} (log level {}), dedup window {:?}, send timeout {:?}",
        config.environment,
        config.log_level,
        config.dedup_window(),
        config.send_timeout()
    );

    // Connect the analytics store if a URL is provided
    let store = match &config.db_url {
        Some(db_url) => match ChatStore::connect(db_url, &config.messages_table, &config.participation_table).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Some(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Analytics endpoints will not be available");
                None
            }
        },
        None => {
            warn!("No database URL configured - analytics endpoints will not be available");
            None
        }
    };

    let address = config.server_address();
    let state = AppState::new(config, store);
    let registry = state.registry.clone();
    let app = create_app(state);

    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    let shutdown = async move {
        shutdown_signal().await;
        let closed = registry.close_all();
        info!("Shutdown requested, closing {} connection(s)", closed);
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
