use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use growth_arena_server::config::{ServerConfig, WorldConfig};
use growth_arena_server::game::game_loop::spawn_room;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Growth Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let world_config = WorldConfig::load_or_default();
    let server_config = ServerConfig::load_or_default();
    info!(
        "Configuration loaded: world={}, pickups={}, bots={}, tick_rate={}, max_humans={}",
        world_config.world_size,
        world_config.pickup_count,
        world_config.bot_count,
        server_config.tick_rate,
        server_config.max_humans
    );

    let (room, task) = spawn_room(world_config, server_config).context("failed to start room")?;
    info!("Room {} ready", room.id());

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    info!("Shutdown signal received");

    if let Err(e) = room.shutdown().await {
        error!("Room shutdown error: {}", e);
    }
    task.await.context("room task panicked")?;

    info!("{}", room.metrics().render_prometheus());
    info!("Server stopped");
    Ok(())
}
