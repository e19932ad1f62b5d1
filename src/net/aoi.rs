//! Visibility filter
//!
//! Derives a per-client snapshot from the canonical world state: everything
//! within the visibility range of the client's player, found through the
//! spatial index rather than a scan of every entity.

use std::cell::RefCell;

use crate::game::spatial::EntityRef;
use crate::game::state::WorldState;
use crate::net::protocol::{HazardSnapshot, PickupSnapshot, PlayerSnapshot, WorldSnapshot};

// Thread-local reusable buffer to avoid per-filter allocations
thread_local! {
    /// Buffer for sorting visible players by distance
    static NEARBY_WITH_DISTANCE_BUFFER: RefCell<Vec<(f32, String)>> = RefCell::new(Vec::with_capacity(128));
}

/// Builds visibility-limited snapshots
#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    range: f32,
}

impl VisibilityFilter {
    pub fn new(range: f32) -> Self {
        Self { range }
    }

    #[inline]
    pub fn range(&self) -> f32 {
        self.range
    }

    /// Snapshot of everything within range of `player_id`'s player
    ///
    /// The requesting player is always first, other players follow closest
    /// first. A client without a live player gets an empty snapshot.
    pub fn filter_for_player(&self, player_id: &str, state: &WorldState, tick: u64) -> WorldSnapshot {
        let Some(me) = state.player(player_id) else {
            return WorldSnapshot::empty(tick);
        };
        let origin = me.position();

        let mut players = vec![PlayerSnapshot::from_player(me)];
        let mut pickups = Vec::new();
        let mut hazards = Vec::new();

        NEARBY_WITH_DISTANCE_BUFFER.with(|buffer_cell| {
            let mut buffer = buffer_cell.borrow_mut();
            buffer.clear();

            state.index().for_each_within(origin, self.range, |entity, _, d2| match entity {
                EntityRef::Player(id) if id != player_id => buffer.push((d2, id.clone())),
                EntityRef::Player(_) => {}
                EntityRef::Pickup(id) => {
                    if let Some(pickup) = state.pickup(*id) {
                        pickups.push(PickupSnapshot::from_pickup(pickup));
                    }
                }
                EntityRef::Hazard(id) => {
                    if let Some(hazard) = state.hazard(*id) {
                        hazards.push(HazardSnapshot::from_hazard(hazard));
                    }
                }
            });

            buffer.sort_by(|a, b| a.0.total_cmp(&b.0));
            players.extend(
                buffer
                    .iter()
                    .filter_map(|(_, id)| state.player(id))
                    .map(PlayerSnapshot::from_player),
            );
        });

        WorldSnapshot {
            tick,
            players,
            pickups,
            hazards,
            total_players: state.player_count() as u32,
            total_pickups: state.pickup_count() as u32,
        }
    }

    /// Get statistics about a filtered snapshot
    pub fn snapshot_stats(state: &WorldState, filtered: &WorldSnapshot) -> VisibilityStats {
        let original = state.player_count() + state.pickup_count() + state.hazard_count();
        let visible = filtered.players.len() + filtered.pickups.len() + filtered.hazards.len();
        VisibilityStats {
            original_entities: original,
            visible_entities: visible,
            reduction_percent: if original > 0 {
                (1.0 - visible as f32 / original as f32) * 100.0
            } else {
                0.0
            },
        }
    }
}

/// Statistics about visibility filtering
#[derive(Debug, Clone)]
pub struct VisibilityStats {
    pub original_entities: usize,
    pub visible_entities: usize,
    pub reduction_percent: f32,
}
