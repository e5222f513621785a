use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, Level};

use cubicle_royale::commentary::CommentaryClient;
use cubicle_royale::config::{CommentaryConfig, SessionConfig};
use cubicle_royale::net::coordinator::{self, Role, Session, SessionEvent};
use cubicle_royale::net::transport::{GuestEndpoint, HostEndpoint};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Cubicle Royale v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::load_or_default();
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {e}");
    }

    let commentary = Arc::new(CommentaryClient::new(CommentaryConfig::load_or_default()));

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // Stand-in presentation layer: log what a renderer would draw
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SessionEvent::Commentary(text) => info!("Boss: {}", text),
                SessionEvent::StateChanged(state) => debug!(
                    "World: {} players ({} alive), {} foods",
                    state.players.len(),
                    state.alive_count(),
                    state.foods.len()
                ),
            }
        }
    });

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    match config.room_code.clone() {
        // Host: simulate, accept guests, share the room code out-of-band
        None => {
            let endpoint = HostEndpoint::bind(config.port).await;
            info!("Room code: {}", config.host_room_code());
            info!("Certificate hash: {}", endpoint.cert_hash);

            let session = Arc::new(RwLock::new(Session::new(
                endpoint.local_id,
                Role::Host,
                events_tx,
            )));
            session.write().await.start_hosting(
                config.player_name.clone(),
                config.player_color.clone(),
                &mut rand::thread_rng(),
            );

            tokio::select! {
                result = coordinator::run_host(session, endpoint, commentary) => {
                    if let Err(e) = result {
                        error!("Session error: {e:#}");
                    }
                }
                _ = shutdown => {
                    info!("Shutting down...");
                }
            }
        }
        // Guest: connect, join, render snapshots
        Some(room_code) => {
            let endpoint = GuestEndpoint::bind().await;
            info!("Joining room {} as {}", room_code, endpoint.local_id);

            let session = Arc::new(RwLock::new(Session::new(
                endpoint.local_id,
                Role::Guest,
                events_tx,
            )));

            tokio::select! {
                result = coordinator::run_guest(
                    session,
                    endpoint,
                    room_code,
                    config.player_name.clone(),
                    config.player_color.clone(),
                ) => {
                    if let Err(e) = result {
                        error!("Session error: {e:#}");
                    }
                }
                _ = shutdown => {
                    info!("Shutting down...");
                }
            }
        }
    }

    info!("Session ended");
    Ok(())
}
