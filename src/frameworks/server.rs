// Framework bootstrap for the arena server runtime.

use crate::domain::GameTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{list_rooms_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RoomSettings, SessionDirectory};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state();
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms", get(list_rooms_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // Session Directory
    // This owns every room task and the participant index.
    let directory = Arc::new(SessionDirectory::new(RoomSettings {
        command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
        broadcast_capacity: config::ROOM_BROADCAST_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        room_capacity: config::ROOM_CAPACITY,
        tuning: GameTuning::default(),
    }));

    let sweep_every = config::room_sweep_interval();
    let idle_timeout = config::room_idle_timeout();
    tracing::debug!(
        sweep_every_secs = sweep_every.as_secs(),
        idle_timeout_secs = idle_timeout.as_secs(),
        "idle sweeper configured"
    );
    directory
        .clone()
        .spawn_idle_sweeper(sweep_every, idle_timeout);

    Arc::new(AppState { directory })
}
