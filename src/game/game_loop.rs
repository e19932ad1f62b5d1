//! Async room runner
//!
//! One tokio task owns a `World`. Inbound calls from the transport, the
//! wall-clock tick and snapshot requests all arrive over a single command
//! channel or the task's own ticker, so world mutations are strictly
//! serialized without any lock around the world.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, ServerConfig, WorldConfig};
use crate::game::state::{GameEvent, PlayerKind};
use crate::game::world::World;
use crate::metrics::Metrics;
use crate::net::protocol::{ClientMessage, MoveIntent, WorldSnapshot};

/// Pending commands a room buffers before senders wait
const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Errors surfaced to callers of a room handle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("room is closed")]
    Closed,
    #[error("room is full ({max} humans)")]
    RoomFull { max: usize },
    #[error("invalid world configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

enum Command {
    Join {
        client: String,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },
    Leave {
        client: String,
        reply: oneshot::Sender<bool>,
    },
    Move {
        client: String,
        intent: MoveIntent,
    },
    Restart,
    Snapshot {
        client: String,
        reply: oneshot::Sender<WorldSnapshot>,
    },
    Shutdown,
}

/// Cloneable handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    metrics: Arc<Metrics>,
}

impl RoomHandle {
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    async fn send(&self, command: Command) -> Result<(), RoomError> {
        self.commands.send(command).await.map_err(|_| RoomError::Closed)
    }

    /// Create a human player for `client`
    ///
    /// Ok(false) if the client already had a live player.
    pub async fn join(&self, client: &str) -> Result<bool, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Join {
            client: client.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Closed)?
    }

    pub async fn leave(&self, client: &str) -> Result<bool, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Leave {
            client: client.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Closed)
    }

    /// Queue one movement step; applied in arrival order
    pub async fn move_player(&self, client: &str, intent: MoveIntent) -> Result<(), RoomError> {
        self.send(Command::Move {
            client: client.to_string(),
            intent,
        })
        .await
    }

    pub async fn restart(&self) -> Result<(), RoomError> {
        self.send(Command::Restart).await
    }

    /// Visibility-filtered snapshot for `client`
    pub async fn snapshot(&self, client: &str) -> Result<WorldSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot {
            client: client.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Closed)
    }

    /// Dispatch a decoded client message
    pub async fn handle_message(&self, client: &str, message: ClientMessage) -> Result<(), RoomError> {
        match message {
            ClientMessage::Join => self.join(client).await.map(|_| ()),
            ClientMessage::Move(intent) => self.move_player(client, intent).await,
            ClientMessage::Leave => self.leave(client).await.map(|_| ()),
            ClientMessage::Restart => self.restart().await,
        }
    }

    /// Stop the room; the world is disposed before the task exits
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(Command::Shutdown).await
    }
}

/// Build a world from `world_config` and start its task
pub fn spawn_room(
    world_config: WorldConfig,
    server_config: ServerConfig,
) -> Result<(RoomHandle, JoinHandle<()>), RoomError> {
    let world = World::new(world_config)?;
    let metrics = Arc::new(Metrics::new());
    metrics.update_population(world.state());

    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let handle = RoomHandle {
        id: world.id(),
        commands: tx,
        metrics: metrics.clone(),
    };
    let task = tokio::spawn(run_room(world, server_config, rx, metrics));
    Ok((handle, task))
}

async fn run_room(
    mut world: World,
    config: ServerConfig,
    mut commands: mpsc::Receiver<Command>,
    metrics: Arc<Metrics>,
) {
    let mut ticker = interval(config.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(room = %world.id(), "Room loop started at {} Hz", config.tick_rate);
    let start = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_stats = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick);
                last_tick = now;

                let started = std::time::Instant::now();
                let events = world.advance(dt);
                metrics.record_tick_time(started.elapsed());
                record(&metrics, &events);

                if now.duration_since(last_stats) >= config.stats_interval {
                    last_stats = now;
                    metrics.update_population(world.state());
                    log_stats(&world, &metrics, start.elapsed());
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!(room = %world.id(), "All room handles dropped");
                    break;
                };
                if !apply(&mut world, &config, &metrics, command) {
                    break;
                }
            }
        }
    }

    world.dispose();
    metrics.update_population(world.state());
    info!(room = %world.id(), "Room loop stopped after {} ticks", world.tick());
}

/// Apply one command; false means stop the loop
fn apply(world: &mut World, config: &ServerConfig, metrics: &Metrics, command: Command) -> bool {
    match command {
        Command::Join { client, reply } => {
            let result = if world.state().player(&client).is_some() {
                Ok(false)
            } else if world.state().human_count() >= config.max_humans {
                metrics.joins_rejected.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                warn!(room = %world.id(), client = %client, "Join rejected, room full");
                Err(RoomError::RoomFull {
                    max: config.max_humans,
                })
            } else {
                Ok(world.join(&client))
            };
            let _ = reply.send(result);
        }
        Command::Leave { client, reply } => {
            let _ = reply.send(world.leave(&client));
        }
        Command::Move { client, intent } => {
            metrics.moves_received.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let events = world.move_player(&client, &intent);
            record(metrics, &events);
        }
        Command::Restart => world.restart(),
        Command::Snapshot { client, reply } => {
            let _ = reply.send(world.snapshot(&client));
        }
        Command::Shutdown => {
            info!(room = %world.id(), "Shutdown requested");
            return false;
        }
    }
    true
}

fn record(metrics: &Metrics, events: &[GameEvent]) {
    if events.is_empty() {
        return;
    }
    metrics.record_events(events);

    // Human sessions end here; the transport learns of it from the next empty snapshot
    for event in events {
        match event {
            GameEvent::PlayerConsumed {
                eater,
                victim,
                victim_kind: PlayerKind::Human,
            } => debug!(eater = %eater, victim = %victim, "Human player consumed"),
            GameEvent::PlayerEliminated {
                player,
                kind: PlayerKind::Human,
                hazard,
            } => debug!(player = %player, hazard, "Human player eliminated"),
            _ => {}
        }
    }
}

fn log_stats(world: &World, metrics: &Metrics, uptime: Duration) {
    use std::sync::atomic::Ordering;

    info!(
        "Room {}: {}s, tick {}, {} humans + {} bots, {} pickups, {} hazards | tick p95 {}us, max {}us",
        world.id(),
        uptime.as_secs(),
        world.tick(),
        world.state().human_count(),
        world.state().bot_count(),
        world.state().pickup_count(),
        world.state().hazard_count(),
        metrics.tick_time_p95_us.load(Ordering::Relaxed),
        metrics.tick_time_max_us.load(Ordering::Relaxed),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;

    fn small_world() -> WorldConfig {
        WorldConfig {
            pickup_count: 200,
            bot_count: 4,
            seed: Some(4),
            ..WorldConfig::default()
        }
    }

    #[tokio::test]
    async fn test_join_snapshot_leave() -> Result<(), RoomError> {
        let (room, task) = spawn_room(small_world(), ServerConfig::default())?;

        assert!(room.join("alice").await?);
        assert!(!room.join("alice").await?);

        let snap = room.snapshot("alice").await?;
        assert_eq!(snap.players.first().map(|p| p.id.as_str()), Some("alice"));
        assert_eq!(snap.total_players, 5);
        assert_eq!(snap.total_pickups, 200);

        assert!(room.leave("alice").await?);
        assert!(room.snapshot("alice").await?.is_empty());

        room.shutdown().await?;
        let _ = task.await;
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = spawn_room(
            WorldConfig {
                world_size: 0.0,
                ..WorldConfig::default()
            },
            ServerConfig::default(),
        );
        assert!(matches!(result, Err(RoomError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_room_full() -> Result<(), RoomError> {
        let server = ServerConfig {
            max_humans: 2,
            ..ServerConfig::default()
        };
        let (room, _task) = spawn_room(small_world(), server)?;

        assert!(room.join("a").await?);
        assert!(room.join("b").await?);
        assert_eq!(room.join("c").await, Err(RoomError::RoomFull { max: 2 }));
        // Rejoining an existing player is not a new human
        assert_eq!(room.join("a").await, Ok(false));
        Ok(())
    }

    #[tokio::test]
    async fn test_moves_are_applied_in_order() -> Result<(), RoomError> {
        let (room, _task) = spawn_room(
            WorldConfig {
                pickup_count: 0,
                bot_count: 0,
                seed: Some(8),
                ..WorldConfig::default()
            },
            ServerConfig::default(),
        )?;
        room.join("mover").await?;
        let before = room.snapshot("mover").await?.players[0].position;

        let toward = if before.x > 0.0 { -1.0 } else { 1.0 };
        for _ in 0..5 {
            room.move_player("mover", MoveIntent::direction(Vec2::new(toward, 0.0))).await?;
        }
        let after = room.snapshot("mover").await?.players[0].position;

        assert!((after.x - (before.x + toward)).abs() < 1e-3, "{:?} -> {:?}", before, after);
        assert_eq!(room.metrics().moves_received.load(std::sync::atomic::Ordering::Relaxed), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_message_dispatch() -> Result<(), RoomError> {
        let (room, _task) = spawn_room(small_world(), ServerConfig::default())?;
        room.handle_message("bob", ClientMessage::Join).await?;
        assert!(!room.snapshot("bob").await?.is_empty());
        room.handle_message("bob", ClientMessage::Restart).await?;
        room.handle_message("bob", ClientMessage::Leave).await?;
        assert!(room.snapshot("bob").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_ticks_advance_world() -> Result<(), RoomError> {
        let (room, _task) = spawn_room(small_world(), ServerConfig::default())?;
        room.join("watcher").await?;
        let first = room.snapshot("watcher").await?.tick;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let later = room.snapshot("watcher").await?.tick;
        assert!(later > first, "tick did not advance: {} -> {}", first, later);
        assert!(room.metrics().tick_count.load(std::sync::atomic::Ordering::Relaxed) > 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_after_shutdown() -> Result<(), RoomError> {
        let (room, task) = spawn_room(small_world(), ServerConfig::default())?;
        room.shutdown().await?;
        let _ = task.await;

        assert_eq!(room.join("late").await, Err(RoomError::Closed));
        assert_eq!(room.snapshot("late").await, Err(RoomError::Closed));
        Ok(())
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_room() -> Result<(), RoomError> {
        let (room, task) = spawn_room(small_world(), ServerConfig::default())?;
        drop(room);
        let finished = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(finished.is_ok(), "room task should exit once all handles are gone");
        Ok(())
    }
}
