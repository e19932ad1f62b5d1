//! World state definitions and structures
//!
//! Contains the three entity kinds (players, pickups, hazard zones) and the
//! `WorldState` that owns them together with their spatial index.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::config::WorldConfig;
use crate::game::constants::growth;
use crate::game::spatial::{EntityRef, SpatialIndex};
use crate::util::vec2::Vec2;

/// Player identifier, supplied by the transport for humans
pub type PlayerId = String;

/// Pickup identifier, never reused within a world
pub type PickupId = u64;

/// Hazard zone identifier, never reused within a world
pub type HazardId = u64;

/// Hash map with a fixed hasher so iteration order follows the world seed
pub type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;

/// Initial capacity for the player map
const PLAYER_MAP_CAPACITY: usize = 128;

/// Who drives a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Human,
    Bot,
}

/// Player state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Inside the world square; changed only through `WorldState` so the
    /// index entry follows it
    position: Vec2,
    /// Size in `[1, max_size]`
    pub size: f32,
    /// Display colour (CSS hsl string)
    pub color: String,
    pub kind: PlayerKind,
}

impl Player {
    pub fn new(id: PlayerId, kind: PlayerKind, position: Vec2, color: String) -> Self {
        Self {
            id,
            position,
            size: growth::START_SIZE,
            color,
            kind,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.kind == PlayerKind::Bot
    }

    #[inline]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Player(self.id.clone())
    }
}

/// Stationary pickup
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pickup {
    pub id: PickupId,
    pub position: Vec2,
}

/// Time-limited elimination zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HazardZone {
    pub id: HazardId,
    pub position: Vec2,
    pub radius: f32,
    /// Seconds until the expiry task removes this zone
    pub remaining_lifetime: f32,
}

/// Something that happened while the world was mutated
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PickupConsumed {
        player: PlayerId,
        pickup: PickupId,
    },
    PlayerConsumed {
        eater: PlayerId,
        victim: PlayerId,
        victim_kind: PlayerKind,
    },
    PlayerEliminated {
        player: PlayerId,
        kind: PlayerKind,
        hazard: HazardId,
    },
    PickupRespawned {
        pickup: PickupId,
    },
    HazardSpawned {
        hazard: HazardId,
        position: Vec2,
    },
    HazardExpired {
        hazard: HazardId,
    },
    BotRespawned {
        bot: PlayerId,
    },
}

/// Canonical world state: entity collections plus the spatial index over them
///
/// Every mutation that adds, removes or moves an entity goes through this
/// type so the index always holds exactly one entry per live entity.
#[derive(Debug, Clone)]
pub struct WorldState {
    config: WorldConfig,
    players: FxHashMap<PlayerId, Player>,
    pickups: FxHashMap<PickupId, Pickup>,
    hazards: FxHashMap<HazardId, HazardZone>,
    index: SpatialIndex,
    rng: StdRng,
    next_entity_id: u64,
}

impl WorldState {
    /// Empty world for an already validated config
    pub fn new(config: WorldConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            index: SpatialIndex::new(config.cell_size, config.world_size),
            players: FxHashMap::with_capacity_and_hasher(PLAYER_MAP_CAPACITY, FxBuildHasher),
            pickups: FxHashMap::with_capacity_and_hasher(config.pickup_count, FxBuildHasher),
            hazards: FxHashMap::default(),
            config,
            rng,
            next_entity_id: 0,
        }
    }

    /// Populate pickups and bots
    pub fn populate(&mut self) {
        for _ in 0..self.config.pickup_count {
            self.spawn_pickup();
        }
        self.spawn_missing_bots();
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Generate a new unique entity ID
    pub fn next_entity_id(&mut self) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Uniformly random in-bounds position
    pub fn random_position(&mut self) -> Vec2 {
        let half = self.config.half_extent();
        Vec2::new(
            self.rng.gen_range(-half..=half),
            self.rng.gen_range(-half..=half),
        )
    }

    pub fn random_color(&mut self) -> String {
        let hue = self.rng.gen_range(0.0..360.0_f32);
        format!("hsl({:.0}, 100%, 50%)", hue)
    }

    // ---- players ----

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Set a player's size, clamped to `[1, max_size]`
    ///
    /// Returns the stored size, or None for an unknown player or a
    /// non-finite size.
    pub fn set_size(&mut self, id: &str, size: f32) -> Option<f32> {
        if !size.is_finite() {
            return None;
        }
        let max_size = self.config.max_size;
        let player = self.players.get_mut(id)?;
        player.size = size.clamp(growth::START_SIZE, max_size);
        Some(player.size)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().cloned().collect()
    }

    pub fn bot_ids(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.is_bot())
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn human_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_bot()).count()
    }

    pub fn bot_count(&self) -> usize {
        self.players.values().filter(|p| p.is_bot()).count()
    }

    /// Create a player at a random position with size 1
    ///
    /// No-op if the identifier already has a live player; returns whether a
    /// player was created.
    pub fn add_player(&mut self, id: PlayerId, kind: PlayerKind) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let position = self.random_position();
        let color = self.random_color();
        self.insert_player(Player::new(id, kind, position, color));
        true
    }

    /// Insert a fully built player, replacing any player with the same id
    pub fn insert_player(&mut self, mut player: Player) {
        let half = self.config.half_extent();
        player.position = player.position.clamp_to_square(half);
        player.size = player.size.clamp(growth::START_SIZE, self.config.max_size);
        self.index.insert(player.entity_ref(), player.position);
        self.players.insert(player.id.clone(), player);
    }

    /// Remove a player and its index entry
    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.index.remove(&player.entity_ref());
        Some(player)
    }

    /// Move a player, keeping the index in step
    ///
    /// The position is clamped to the world square; non-finite positions are
    /// refused.
    pub fn move_player(&mut self, id: &str, position: Vec2) -> bool {
        if !position.is_finite() {
            return false;
        }
        let position = position.clamp_to_square(self.config.half_extent());
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        player.position = position;
        self.index.relocate(&EntityRef::Player(player.id.clone()), position)
    }

    /// Reset a player in place: same id, size 1, new random position
    pub fn reset_player(&mut self, id: &str) -> bool {
        if !self.players.contains_key(id) {
            return false;
        }
        let position = self.random_position();
        self.set_size(id, growth::START_SIZE);
        self.move_player(id, position)
    }

    /// Create any of `bot_0..bot_{bot_count}` that is not in the world
    pub fn spawn_missing_bots(&mut self) -> Vec<PlayerId> {
        let mut spawned = Vec::new();
        for n in 0..self.config.bot_count {
            let id = bot_id(n);
            if self.add_player(id.clone(), PlayerKind::Bot) {
                spawned.push(id);
            }
        }
        spawned
    }

    // ---- pickups ----

    pub fn pickup(&self, id: PickupId) -> Option<&Pickup> {
        self.pickups.get(&id)
    }

    pub fn pickups(&self) -> impl Iterator<Item = &Pickup> {
        self.pickups.values()
    }

    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }

    /// Create a pickup at a random position
    pub fn spawn_pickup(&mut self) -> PickupId {
        let position = self.random_position();
        self.spawn_pickup_at(position)
    }

    pub fn spawn_pickup_at(&mut self, position: Vec2) -> PickupId {
        let id = self.next_entity_id();
        let position = position.clamp_to_square(self.config.half_extent());
        self.pickups.insert(id, Pickup { id, position });
        self.index.insert(EntityRef::Pickup(id), position);
        id
    }

    pub fn remove_pickup(&mut self, id: PickupId) -> Option<Pickup> {
        let pickup = self.pickups.remove(&id)?;
        self.index.remove(&EntityRef::Pickup(id));
        Some(pickup)
    }

    // ---- hazards ----

    pub fn hazard(&self, id: HazardId) -> Option<&HazardZone> {
        self.hazards.get(&id)
    }

    pub fn hazards(&self) -> impl Iterator<Item = &HazardZone> {
        self.hazards.values()
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.len()
    }

    /// Create a hazard zone at a random position with a full lifetime
    pub fn spawn_hazard(&mut self) -> HazardId {
        let position = self.random_position();
        self.spawn_hazard_at(position)
    }

    pub fn spawn_hazard_at(&mut self, position: Vec2) -> HazardId {
        let id = self.next_entity_id();
        let position = position.clamp_to_square(self.config.half_extent());
        let hazard = HazardZone {
            id,
            position,
            radius: self.config.hazard_size,
            remaining_lifetime: self.config.hazard_lifetime.as_secs_f32(),
        };
        self.hazards.insert(id, hazard);
        self.index.insert(EntityRef::Hazard(id), position);
        id
    }

    pub fn remove_hazard(&mut self, id: HazardId) -> Option<HazardZone> {
        let hazard = self.hazards.remove(&id)?;
        self.index.remove(&EntityRef::Hazard(id));
        Some(hazard)
    }

    /// Count every hazard's lifetime down by `dt` seconds, stopping at zero
    pub fn tick_hazard_lifetimes(&mut self, dt: f32) {
        for hazard in self.hazards.values_mut() {
            hazard.remaining_lifetime = (hazard.remaining_lifetime - dt).max(0.0);
        }
    }

    // ---- whole world ----

    /// Clear pickups and hazards, respawn the pickup population, and reset
    /// every player to size 1 at a random position
    ///
    /// Pending timers are owned by the caller's scheduler and must be
    /// cancelled there.
    pub fn restart(&mut self) {
        let pickup_ids: Vec<PickupId> = self.pickups.keys().copied().collect();
        for id in pickup_ids {
            self.remove_pickup(id);
        }
        let hazard_ids: Vec<HazardId> = self.hazards.keys().copied().collect();
        for id in hazard_ids {
            self.remove_hazard(id);
        }
        for _ in 0..self.config.pickup_count {
            self.spawn_pickup();
        }
        for id in self.player_ids() {
            self.reset_player(&id);
        }
    }

    /// Check that the index mirrors the entity collections exactly
    pub fn index_consistent(&self) -> bool {
        let expected = self.players.len() + self.pickups.len() + self.hazards.len();
        if self.index.len() != expected {
            return false;
        }
        self.players
            .values()
            .all(|p| self.index.position_of(&p.entity_ref()) == Some(p.position))
            && self
                .pickups
                .values()
                .all(|p| self.index.position_of(&EntityRef::Pickup(p.id)) == Some(p.position))
            && self
                .hazards
                .values()
                .all(|h| self.index.position_of(&EntityRef::Hazard(h.id)) == Some(h.position))
    }
}

/// Identifier of the n-th bot
pub fn bot_id(n: usize) -> PlayerId {
    format!("bot_{}", n)
}
