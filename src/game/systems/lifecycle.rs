//! Time-driven population control: decay, respawns and hazard zones

use std::time::Duration;

use crate::game::schedule::{Scheduler, Task};
use crate::game::state::{GameEvent, HazardId, PlayerKind, WorldState};

/// Shrink every player above the decay threshold
///
/// Loss per interval is `(size - T) / (MAX - T) * rate`, never taking the
/// size below `T`. Returns how many players decayed.
pub fn apply_decay(state: &mut WorldState) -> usize {
    let threshold = state.config().decay_threshold;
    let span = state.config().max_size - threshold;
    let rate = state.config().decay_rate;

    let ids: Vec<_> = state
        .players()
        .filter(|p| p.size > threshold)
        .map(|p| p.id.clone())
        .collect();

    for id in &ids {
        if let Some(size) = state.player(id).map(|p| p.size) {
            let loss = (size - threshold) / span * rate;
            state.set_size(id, (size - loss).max(threshold));
        }
    }
    ids.len()
}

/// Create one replacement pickup at a random position
pub fn respawn_pickup(state: &mut WorldState) -> GameEvent {
    let pickup = state.spawn_pickup();
    GameEvent::PickupRespawned { pickup }
}

/// Create a hazard zone and schedule its expiry
pub fn spawn_hazard(state: &mut WorldState, scheduler: &mut Scheduler, now: Duration) -> GameEvent {
    let hazard = state.spawn_hazard();
    scheduler.schedule_once(now, state.config().hazard_lifetime, Task::ExpireHazard(hazard));
    let position = state.hazard(hazard).map(|h| h.position).unwrap_or_default();
    tracing::debug!(hazard, x = position.x, y = position.y, "Hazard zone spawned");
    GameEvent::HazardSpawned { hazard, position }
}

/// Remove a hazard zone at the end of its lifetime
///
/// A hazard already cleared (e.g. by a restart) is a no-op.
pub fn expire_hazard(state: &mut WorldState, hazard: HazardId) -> Option<GameEvent> {
    state.remove_hazard(hazard)?;
    tracing::debug!(hazard, "Hazard zone expired");
    Some(GameEvent::HazardExpired { hazard })
}

/// Recreate a bot with its old identifier at size 1
pub fn respawn_bot(state: &mut WorldState, bot: &str) -> Option<GameEvent> {
    if !state.add_player(bot.to_string(), PlayerKind::Bot) {
        return None;
    }
    Some(GameEvent::BotRespawned { bot: bot.to_string() })
}
