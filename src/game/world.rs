//! The room: world state, its task queue and a simulated clock
//!
//! `World` is the single owner of all mutable simulation data. Every inbound
//! call (join, leave, move, restart) and every timed task runs to completion
//! on `&mut self`, so nothing ever observes a half-updated index.

use std::time::Duration;

use uuid::Uuid;

use crate::config::{ConfigError, WorldConfig};
use crate::game::schedule::{Scheduler, Task};
use crate::game::state::{GameEvent, PlayerKind, WorldState};
use crate::game::systems::{collision, lifecycle, movement, steering};
use crate::net::aoi::VisibilityFilter;
use crate::net::protocol::{MoveIntent, WorldSnapshot};

/// One simulated room
#[derive(Debug)]
pub struct World {
    id: Uuid,
    state: WorldState,
    scheduler: Scheduler,
    visibility: VisibilityFilter,
    /// Simulated time since creation
    clock: Duration,
    /// Number of `advance` calls so far
    tick: u64,
    disposed: bool,
}

impl World {
    /// Validate `config`, populate pickups and bots, and arm the recurring tasks
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(Duration::ZERO, config.bot_tick_interval, Task::BotTick);
        scheduler.schedule_repeating(Duration::ZERO, config.decay_interval, Task::Decay);
        scheduler.schedule_repeating(Duration::ZERO, config.hazard_spawn_interval, Task::SpawnHazard);

        let visibility = VisibilityFilter::new(config.visibility_range);
        let mut state = WorldState::new(config);
        state.populate();

        let world = Self {
            id: Uuid::new_v4(),
            state,
            scheduler,
            visibility,
            clock: Duration::ZERO,
            tick: 0,
            disposed: false,
        };
        tracing::info!(
            room = %world.id,
            pickups = world.state.pickup_count(),
            bots = world.state.bot_count(),
            "World created"
        );
        Ok(world)
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time since creation
    #[inline]
    pub fn now(&self) -> Duration {
        self.clock
    }

    #[inline]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Direct state access for setting up scenarios
    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Create a human player for `client_id`
    ///
    /// Returns false if the client already has a live player or the world is
    /// disposed.
    pub fn join(&mut self, client_id: &str) -> bool {
        if self.disposed {
            return false;
        }
        let created = self.state.add_player(client_id.to_string(), PlayerKind::Human);
        if created {
            tracing::debug!(room = %self.id, client = client_id, "Player joined");
        }
        created
    }

    /// Remove the client's player, if any
    pub fn leave(&mut self, client_id: &str) -> bool {
        let removed = self.state.remove_player(client_id).is_some();
        if removed {
            tracing::debug!(room = %self.id, client = client_id, "Player left");
        }
        removed
    }

    /// One movement step plus collision resolution for a human player
    ///
    /// Intents for players that no longer exist are ignored.
    pub fn move_player(&mut self, client_id: &str, intent: &MoveIntent) -> Vec<GameEvent> {
        if self.disposed {
            return Vec::new();
        }
        if movement::apply_intent(&mut self.state, client_id, intent).is_none() {
            return Vec::new();
        }
        collision::resolve(&mut self.state, &mut self.scheduler, self.clock, client_id)
    }

    /// Start a fresh round
    ///
    /// Clears pickups and hazards, repopulates pickups, recreates any missing
    /// bots and resets every player to size 1 at a random position. Pending
    /// respawns and expiries are cancelled and the hazard timer restarts.
    pub fn restart(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self
            .scheduler
            .cancel_where(|task| !task.is_recurring() || *task == Task::SpawnHazard);
        self.scheduler.schedule_repeating(
            self.clock,
            self.state.config().hazard_spawn_interval,
            Task::SpawnHazard,
        );

        self.state.restart();
        self.state.spawn_missing_bots();

        tracing::info!(room = %self.id, cancelled, "World restarted");
    }

    /// Visibility-filtered view for one client
    pub fn snapshot(&self, client_id: &str) -> WorldSnapshot {
        self.visibility.filter_for_player(client_id, &self.state, self.tick)
    }

    /// Move the simulated clock forward by `dt`, running every task that
    /// comes due, in due order
    pub fn advance(&mut self, dt: Duration) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.disposed {
            return events;
        }

        let target = self.clock.saturating_add(dt);
        while let Some((due, task)) = self.scheduler.pop_due(target) {
            self.elapse_to(due);
            self.run_task(task, &mut events);
        }

        self.elapse_to(target);
        self.tick += 1;
        events
    }

    /// Move the clock to `time`, counting hazard lifetimes down by the gap
    fn elapse_to(&mut self, time: Duration) {
        let gap = time.saturating_sub(self.clock);
        if !gap.is_zero() {
            self.state.tick_hazard_lifetimes(gap.as_secs_f32());
            self.clock = time;
        }
    }

    fn run_task(&mut self, task: Task, events: &mut Vec<GameEvent>) {
        match task {
            Task::BotTick => self.step_bots(events),
            Task::Decay => {
                lifecycle::apply_decay(&mut self.state);
            }
            Task::SpawnHazard => {
                events.push(lifecycle::spawn_hazard(&mut self.state, &mut self.scheduler, self.clock));
            }
            Task::RespawnPickup => events.push(lifecycle::respawn_pickup(&mut self.state)),
            Task::ExpireHazard(hazard) => events.extend(lifecycle::expire_hazard(&mut self.state, hazard)),
            Task::RespawnBot(bot) => events.extend(lifecycle::respawn_bot(&mut self.state, &bot)),
        }
    }

    fn step_bots(&mut self, events: &mut Vec<GameEvent>) {
        for bot in self.state.bot_ids() {
            // An earlier bot may have reset or eliminated this one
            let Some(direction) = steering::steer(&self.state, &bot) else {
                continue;
            };
            if movement::step(&mut self.state, &bot, direction).is_some() {
                events.extend(collision::resolve(&mut self.state, &mut self.scheduler, self.clock, &bot));
            }
        }
    }

    /// Cancel every pending task; further `advance` calls do nothing
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.scheduler.cancel_all();
        self.disposed = true;
        tracing::info!(room = %self.id, cancelled, "World disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::spatial::EntityRef;
    use crate::game::state::Player;
    use crate::util::vec2::Vec2;

    fn quiet_config() -> WorldConfig {
        WorldConfig {
            pickup_count: 0,
            bot_count: 0,
            seed: Some(17),
            ..WorldConfig::default()
        }
    }

    fn place(world: &mut World, id: &str, kind: PlayerKind, position: Vec2, size: f32) {
        let mut player = Player::new(id.into(), kind, position, String::new());
        player.size = size;
        world.state_mut().insert_player(player);
    }

    fn size_of(world: &World, id: &str) -> f32 {
        world.state().player(id).unwrap().size
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_new_populates() {
        let world = World::new(WorldConfig {
            pickup_count: 500,
            seed: Some(1),
            ..WorldConfig::default()
        });
        let world = match world {
            Ok(w) => w,
            Err(e) => panic!("config rejected: {}", e),
        };
        assert_eq!(world.state().pickup_count(), 500);
        assert_eq!(world.state().bot_count(), 50);
        assert_eq!(world.scheduler().len(), 3);
        assert!(world.state().index_consistent());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let result = World::new(WorldConfig {
            cell_size: 0.0,
            ..WorldConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::NonPositive { field: "cell_size" })));

        let result = World::new(WorldConfig {
            world_size: -1.0,
            ..WorldConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_join_and_leave() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        assert!(world.join("alice"));
        assert!(!world.join("alice"), "second join is a no-op");
        assert_eq!(world.state().human_count(), 1);
        assert_eq!(world.state().player("alice").map(|p| p.size), Some(1.0));

        assert!(world.leave("alice"));
        assert!(!world.leave("alice"));
        assert!(!world.state().index().contains(&EntityRef::Player("alice".into())));
        Ok(())
    }

    #[test]
    fn test_move_consumes_pickup() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        place(&mut world, "p", PlayerKind::Human, Vec2::new(-0.2, 0.0), 10.0);
        let pickup = world.state_mut().spawn_pickup_at(Vec2::new(1.0, 0.0));

        let events = world.move_player("p", &MoveIntent::direction(Vec2::new(1.0, 0.0)));

        assert!(world.state().pickup(pickup).is_none());
        assert!((size_of(&world, "p") - 10.1).abs() < 1e-5);
        assert_eq!(events.len(), 1);
        Ok(())
    }

    #[test]
    fn test_move_for_missing_player_is_ignored() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        assert!(world.move_player("ghost", &MoveIntent::target(Vec2::ZERO)).is_empty());
        Ok(())
    }

    #[test]
    fn test_nan_intent_never_reaches_state() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        place(&mut world, "p", PlayerKind::Human, Vec2::new(3.0, 3.0), 1.0);
        world.move_player("p", &MoveIntent::direction(Vec2::new(f32::NAN, f32::NAN)));
        world.move_player("p", &MoveIntent::target(Vec2::new(f32::INFINITY, 0.0)));

        assert_eq!(world.state().player("p").unwrap().position(), Vec2::new(3.0, 3.0));
        assert!(world.state().index_consistent());
        Ok(())
    }

    #[test]
    fn test_pickup_respawns_after_delay() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            pickup_count: 10,
            ..quiet_config()
        })?;
        let old_ids: Vec<u64> = world.state().pickups().map(|p| p.id).collect();
        let target = world.state().pickups().next().unwrap().position;

        let mut eater = Player::new("p".into(), PlayerKind::Human, target, String::new());
        eater.size = 2.0;
        world.state_mut().insert_player(eater);
        world.move_player("p", &MoveIntent::direction(Vec2::new(1.0, 0.0)));
        let count_after_eat = world.state().pickup_count();
        assert!(count_after_eat < 10);

        world.advance(secs(4.9));
        assert_eq!(world.state().pickup_count(), count_after_eat);

        world.advance(secs(0.2));
        assert_eq!(world.state().pickup_count(), 10);
        assert!(world.state().pickups().any(|p| !old_ids.contains(&p.id)));
        assert!(world.state().index_consistent());
        Ok(())
    }

    #[test]
    fn test_bot_consumed_scenario() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        place(&mut world, "a", PlayerKind::Human, Vec2::ZERO, 20.0);
        place(&mut world, "bot_0", PlayerKind::Bot, Vec2::new(2.0, 0.0), 5.0);
        // One step toward B, then resolution
        let events = world.move_player("a", &MoveIntent::target(Vec2::new(2.0, 0.0)));

        assert!((size_of(&world, "a") - 22.5).abs() < 1e-5);
        assert_eq!(size_of(&world, "bot_0"), 1.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerConsumed { victim_kind: PlayerKind::Bot, .. })));
        Ok(())
    }

    #[test]
    fn test_hazard_scenario_and_persistence() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        let hazard = world.state_mut().spawn_hazard_at(Vec2::ZERO);
        place(&mut world, "h", PlayerKind::Human, Vec2::new(3.0, 0.0), 30.0);

        world.move_player("h", &MoveIntent::direction(Vec2::new(0.0, 1.0)));

        assert!(world.state().player("h").is_none());
        assert!(world.state().hazard(hazard).is_some());
        Ok(())
    }

    #[test]
    fn test_hazards_spawn_and_expire() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            hazard_spawn_interval: secs(30.0),
            hazard_lifetime: secs(10.0),
            ..quiet_config()
        })?;

        let events = world.advance(secs(30.0));
        assert!(events.iter().any(|e| matches!(e, GameEvent::HazardSpawned { .. })));
        assert_eq!(world.state().hazard_count(), 1);

        world.advance(secs(5.0));
        let remaining = world.state().hazards().next().unwrap().remaining_lifetime;
        assert!((remaining - 5.0).abs() < 1e-3, "{}", remaining);

        let events = world.advance(secs(5.0));
        assert!(events.iter().any(|e| matches!(e, GameEvent::HazardExpired { .. })));
        assert_eq!(world.state().hazard_count(), 0);
        Ok(())
    }

    #[test]
    fn test_hazard_spawned_mid_advance_counts_down_remaining_time() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            hazard_spawn_interval: secs(1.0),
            hazard_lifetime: secs(30.0),
            ..quiet_config()
        })?;

        // Spawns at t=1.0, so 0.9 s of this step has already elapsed for it
        world.advance(secs(1.9));
        let remaining = world.state().hazards().next().unwrap().remaining_lifetime;
        assert!((remaining - 29.1).abs() < 1e-3, "{}", remaining);
        assert_eq!(world.now(), secs(1.9));
        Ok(())
    }

    #[test]
    fn test_huge_intervals_are_rejected_at_creation() {
        let result = World::new(WorldConfig {
            pickup_respawn_delay: Duration::MAX,
            ..quiet_config()
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRange { field: "pickup_respawn_delay", .. })
        ));
    }

    #[test]
    fn test_bot_eliminated_by_hazard_returns() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        world.state_mut().spawn_hazard_at(Vec2::new(400.0, 400.0));
        place(&mut world, "bot_0", PlayerKind::Bot, Vec2::new(400.0, 401.0), 1.0);
        // No targets: the bot stays put, so hit it directly through a resolve pass
        let mut sched = Scheduler::new();
        collision::resolve(world.state_mut(), &mut sched, Duration::ZERO, "bot_0");
        assert!(world.state().player("bot_0").is_none());
        assert_eq!(sched.count_where(|t| matches!(t, Task::RespawnBot(_))), 1);

        // The world's own path: bot walks into the hazard and is recreated later
        let mut world = World::new(WorldConfig {
            bot_count: 1,
            ..quiet_config()
        })?;
        let bot_pos = world.state().player("bot_0").unwrap().position();
        world.state_mut().spawn_hazard_at(bot_pos);
        world.state_mut().spawn_pickup_at(bot_pos + Vec2::new(0.0, 3.0));
        world.advance(secs(1.0 / 60.0));
        assert!(world.state().player("bot_0").is_none());

        world.advance(secs(5.1));
        assert!(world.state().player("bot_0").is_some_and(|b| b.is_bot() && b.size == 1.0));
        Ok(())
    }

    #[test]
    fn test_decay_runs_on_interval() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        place(&mut world, "big", PlayerKind::Human, Vec2::ZERO, 50.0);
        for _ in 0..600 {
            world.advance(secs(1.0 / 60.0));
        }
        let size = size_of(&world, "big");
        assert!(size < 50.0 && size >= 40.0, "size {}", size);
        Ok(())
    }

    #[test]
    fn test_bots_move_toward_pickups() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            bot_count: 1,
            ..quiet_config()
        })?;
        let start = world.state().player("bot_0").unwrap().position();
        let target = (start + Vec2::new(50.0, 0.0)).clamp_to_square(500.0);
        let target = if target.distance_to(start) < 1.0 { start - Vec2::new(50.0, 0.0) } else { target };
        world.state_mut().spawn_pickup_at(target);

        let before = start.distance_to(target);
        for _ in 0..10 {
            world.advance(secs(1.0 / 60.0));
        }
        let after = world.state().player("bot_0").unwrap().position().distance_to(target);
        assert!(after < before, "bot should approach: {} -> {}", before, after);
        Ok(())
    }

    #[test]
    fn test_restart() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            pickup_count: 200,
            bot_count: 3,
            ..quiet_config()
        })?;
        world.join("alice");
        world.state_mut().set_size("alice", 33.0).unwrap();
        world.state_mut().spawn_hazard();
        world.state_mut().remove_player("bot_1");
        let victim = world.state().pickups().next().unwrap().id;
        world.state_mut().remove_pickup(victim).unwrap();
        assert_eq!(world.state().pickup_count(), 199);

        world.restart();

        assert_eq!(world.state().pickup_count(), 200);
        assert_eq!(world.state().hazard_count(), 0);
        assert_eq!(world.state().bot_count(), 3);
        assert!(world.state().players().all(|p| p.size == 1.0));
        assert!(world.state().index_consistent());
        Ok(())
    }

    #[test]
    fn test_restart_cancels_pending_respawns() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            pickup_count: 50,
            ..quiet_config()
        })?;
        place(&mut world, "p", PlayerKind::Human, Vec2::new(0.0, 0.0), 10.0);
        world.state_mut().spawn_pickup_at(Vec2::new(0.2, 0.0));
        world.move_player("p", &MoveIntent::direction(Vec2::new(1.0, 0.0)));
        assert!(world.scheduler().count_where(|t| *t == Task::RespawnPickup) >= 1);

        world.restart();
        assert_eq!(world.scheduler().count_where(|t| *t == Task::RespawnPickup), 0);

        world.advance(secs(6.0));
        assert_eq!(world.state().pickup_count(), 50);
        Ok(())
    }

    #[test]
    fn test_sizes_stay_in_bounds_over_time() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            pickup_count: 2000,
            bot_count: 20,
            hazard_spawn_interval: secs(2.0),
            ..quiet_config()
        })?;
        for _ in 0..600 {
            world.advance(secs(1.0 / 60.0));
            for p in world.state().players() {
                assert!(p.size >= 1.0 && p.size <= 50.0, "{} has size {}", p.id, p.size);
                assert!(p.position().x.abs() <= 500.0 && p.position().y.abs() <= 500.0);
            }
        }
        assert!(world.state().index_consistent());
        Ok(())
    }

    #[test]
    fn test_snapshot() -> Result<(), ConfigError> {
        let mut world = World::new(quiet_config())?;
        place(&mut world, "me", PlayerKind::Human, Vec2::ZERO, 1.0);
        place(&mut world, "you", PlayerKind::Human, Vec2::new(10.0, 0.0), 1.0);

        let snap = world.snapshot("me");
        assert_eq!(snap.players.first().map(|p| p.id.as_str()), Some("me"));
        assert_eq!(snap.players.len(), 2);
        assert!(world.snapshot("nobody").is_empty());
        Ok(())
    }

    #[test]
    fn test_dispose_stops_everything() -> Result<(), ConfigError> {
        let mut world = World::new(WorldConfig {
            pickup_count: 20,
            bot_count: 2,
            ..quiet_config()
        })?;
        world.dispose();
        assert!(world.is_disposed());
        assert!(world.scheduler().is_empty());

        let tick = world.tick();
        assert!(world.advance(secs(60.0)).is_empty());
        assert_eq!(world.tick(), tick);
        assert_eq!(world.state().hazard_count(), 0);
        assert!(!world.join("late"));
        Ok(())
    }

    #[test]
    fn test_worlds_are_independent() -> Result<(), ConfigError> {
        let mut a = World::new(quiet_config())?;
        let b = World::new(quiet_config())?;
        a.join("alice");
        assert_ne!(a.id(), b.id());
        assert_eq!(b.state().player_count(), 0);
        Ok(())
    }
}
