//! Collision resolution for one player after it moved
//!
//! Runs three checks in a fixed order against the player's current position:
//! pickups, then smaller players, then hazard zones. Growth from an earlier
//! hit is visible to every later check in the same pass.

use std::time::Duration;

use smallvec::SmallVec;

use crate::game::constants::{growth, hazard};
use crate::game::schedule::{Scheduler, Task};
use crate::game::spatial::EntityRef;
use crate::game::state::{GameEvent, HazardId, PickupId, PlayerId, PlayerKind, WorldState};

/// Resolve every collision for `player_id`
///
/// Consumed pickups get a respawn scheduled; a bot removed by a hazard gets a
/// bot respawn scheduled. Unknown players are a no-op.
pub fn resolve(
    state: &mut WorldState,
    scheduler: &mut Scheduler,
    now: Duration,
    player_id: &str,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if state.player(player_id).is_none() {
        return events;
    }

    consume_pickups(state, scheduler, now, player_id, &mut events);
    consume_players(state, player_id, &mut events);
    check_hazards(state, scheduler, now, player_id, &mut events);

    events
}

fn grow(state: &mut WorldState, player_id: &str, amount: f32) -> f32 {
    let Some(size) = state.player(player_id).map(|p| p.size) else {
        return 0.0;
    };
    if size >= state.config().max_size {
        return size;
    }
    state.set_size(player_id, size + amount).unwrap_or(size)
}

fn consume_pickups(
    state: &mut WorldState,
    scheduler: &mut Scheduler,
    now: Duration,
    player_id: &str,
    events: &mut Vec<GameEvent>,
) {
    let Some(player) = state.player(player_id) else {
        return;
    };
    let (origin, mut size) = (player.position(), player.size);

    // Gather with the largest reach growth could produce, closest first
    let limit = state.config().max_size * growth::PICKUP_REACH;
    let mut candidates: SmallVec<[(f32, PickupId); 16]> = SmallVec::new();
    state.index().for_each_within(origin, limit, |entity, _, d2| {
        if let EntityRef::Pickup(id) = entity {
            candidates.push((d2, *id));
        }
    });
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (d2, pickup_id) in candidates {
        let reach = size * growth::PICKUP_REACH;
        if d2.sqrt() >= reach {
            break;
        }
        if state.remove_pickup(pickup_id).is_none() {
            continue;
        }
        size = grow(state, player_id, growth::PICKUP_GAIN);
        scheduler.schedule_once(now, state.config().pickup_respawn_delay, Task::RespawnPickup);
        events.push(GameEvent::PickupConsumed {
            player: player_id.to_string(),
            pickup: pickup_id,
        });
    }
}

fn consume_players(state: &mut WorldState, player_id: &str, events: &mut Vec<GameEvent>) {
    let Some(player) = state.player(player_id) else {
        return;
    };
    let origin = player.position();

    let limit = state.config().max_size * growth::PLAYER_REACH;
    let mut candidates: SmallVec<[(f32, PlayerId); 16]> = SmallVec::new();
    state.index().for_each_within(origin, limit, |entity, _, d2| {
        if let EntityRef::Player(id) = entity {
            if id != player_id {
                candidates.push((d2, id.clone()));
            }
        }
    });
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (d2, victim_id) in candidates {
        let Some(size) = state.player(player_id).map(|p| p.size) else {
            return;
        };
        let Some((victim_size, victim_kind)) = state.player(&victim_id).map(|v| (v.size, v.kind)) else {
            continue;
        };
        if victim_size >= size || d2.sqrt() >= (size - victim_size) * growth::PLAYER_REACH {
            continue;
        }

        grow(state, player_id, victim_size * growth::PLAYER_GAIN_RATIO);
        match victim_kind {
            PlayerKind::Bot => {
                state.reset_player(&victim_id);
            }
            PlayerKind::Human => {
                state.remove_player(&victim_id);
            }
        }
        tracing::debug!(eater = player_id, victim = %victim_id, ?victim_kind, "Player consumed");
        events.push(GameEvent::PlayerConsumed {
            eater: player_id.to_string(),
            victim: victim_id,
            victim_kind,
        });
    }
}

fn check_hazards(
    state: &mut WorldState,
    scheduler: &mut Scheduler,
    now: Duration,
    player_id: &str,
    events: &mut Vec<GameEvent>,
) {
    let Some(origin) = state.player(player_id).map(|p| p.position()) else {
        return;
    };

    let limit = state.config().hazard_size * hazard::REACH;
    let mut hit: Option<(f32, HazardId)> = None;
    state.index().for_each_within(origin, limit, |entity, _, d2| {
        if let EntityRef::Hazard(id) = entity {
            if hit.map_or(true, |(best, _)| d2 < best) {
                hit = Some((d2, *id));
            }
        }
    });

    let Some((d2, hazard_id)) = hit else {
        return;
    };
    let Some(radius) = state.hazard(hazard_id).map(|h| h.radius) else {
        return;
    };
    if d2.sqrt() >= radius * hazard::REACH {
        return;
    }

    let Some(player) = state.remove_player(player_id) else {
        return;
    };
    if player.kind == PlayerKind::Bot {
        scheduler.schedule_once(
            now,
            state.config().bot_respawn_delay,
            Task::RespawnBot(player.id.clone()),
        );
    }
    tracing::debug!(player = player_id, hazard = hazard_id, "Player eliminated by hazard");
    events.push(GameEvent::PlayerEliminated {
        player: player.id,
        kind: player.kind,
        hazard: hazard_id,
    });
}
