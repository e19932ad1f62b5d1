//! Bot target selection
//!
//! Each bot heads for the nearest pickup or strictly smaller player, found
//! through the spatial index.

use crate::game::spatial::{EntityRef, Nearest};
use crate::game::state::WorldState;
use crate::util::vec2::Vec2;

/// Nearest eligible target for a bot, or None if nothing qualifies
pub fn select_target(state: &WorldState, bot_id: &str) -> Option<Nearest> {
    let bot = state.player(bot_id)?;
    let (origin, size) = (bot.position(), bot.size);

    state.index().nearest(origin, |entity, _| match entity {
        EntityRef::Pickup(_) => true,
        EntityRef::Player(other) => {
            other != bot_id && state.player(other).is_some_and(|p| p.size < size)
        }
        EntityRef::Hazard(_) => false,
    })
}

/// Unit direction from a bot toward its chosen target
///
/// None when there is no target or the bot already stands on it.
pub fn steer(state: &WorldState, bot_id: &str) -> Option<Vec2> {
    let origin = state.player(bot_id)?.position();
    let target = select_target(state, bot_id)?;
    let delta = target.position - origin;
    if delta.length_sq() == 0.0 {
        return None;
    }
    Some(delta.normalize())
}
