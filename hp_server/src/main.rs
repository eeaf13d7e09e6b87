//! House poker server.
//!
//! Rooms are created on demand by players and each one runs as its own
//! actor owned by the [`RoomManager`]. A background reaper closes rooms that
//! are empty or have gone idle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use house_poker::{
    RoomManager,
    room::{IdleOrEmpty, start_reaper_task},
};
use hp_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
};
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a house poker server

USAGE:
  hp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DEFAULT_START_STACK      Chips a new seat starts with  [default: 1000]
  MAX_PLAYERS_PER_ROOM     Seats per room, 2 to 23  [default: 10]
  NEXT_HAND_DELAY_SECS     Pause between hands  [default: 8]
  ALLOW_JOIN_IN_PROGRESS   Let players sit down mid-game  [default: false]
  REAPER_INTERVAL_SECS     How often idle rooms are swept  [default: 60]
  ROOM_IDLE_TIMEOUT_SECS   Idle time before a room is closed  [default: 1800]
  RUST_LOG                 Log filter  [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = ServerConfig::from_env(bind)?;
    config.validate()?;

    info!(
        "Rooms start at {} chips, up to {} players, {}s between hands",
        config.default_starting_stack(),
        config.room.max_players,
        config.room.next_hand_delay.as_secs()
    );

    let room_manager = Arc::new(RoomManager::new(config.room.clone())?);

    let reaper = start_reaper_task(
        room_manager.clone(),
        config.reaper.clone(),
        IdleOrEmpty {
            idle_threshold: config.reaper.idle_threshold,
        },
    );

    let app = api::create_router(AppState {
        room_manager: room_manager.clone(),
    });

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    reaper.abort();
    for code in room_manager.room_codes().await {
        let _ = room_manager.close_room(code).await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
