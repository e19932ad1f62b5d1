//! Turns a direction into a bounded, size-scaled step

use crate::game::constants::speed_for_size;
use crate::game::state::WorldState;
use crate::net::protocol::MoveIntent;
use crate::util::vec2::Vec2;

/// Move a player one step along `direction` (expected to be unit length)
///
/// Step length is `base_speed / size^0.4`; the result is clamped to the world
/// square on both axes independently and the index entry follows it. Returns
/// the new position, or None if the player is gone or the direction is
/// unusable.
pub fn step(state: &mut WorldState, player_id: &str, direction: Vec2) -> Option<Vec2> {
    if !direction.is_finite() || direction.length_sq() == 0.0 {
        return None;
    }
    let (position, size) = match state.player(player_id) {
        Some(p) => (p.position(), p.size),
        None => return None,
    };

    let speed = speed_for_size(state.config().base_speed, size);
    let next = (position + direction * speed).clamp_to_square(state.config().half_extent());
    if !next.is_finite() {
        return None;
    }

    state.move_player(player_id, next).then_some(next)
}

/// Apply a human movement intent
///
/// Zero-length and non-finite intents move nothing.
pub fn apply_intent(state: &mut WorldState, player_id: &str, intent: &MoveIntent) -> Option<Vec2> {
    let from = state.player(player_id)?.position();
    match intent.unit_direction(from) {
        Some(direction) => step(state, player_id, direction),
        None => {
            tracing::debug!(player = player_id, ?intent, "Ignoring unusable move intent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::game::state::{Player, PlayerKind};

    fn world_with(id: &str, position: Vec2, size: f32) -> WorldState {
        let mut state = WorldState::new(WorldConfig {
            pickup_count: 0,
            bot_count: 0,
            seed: Some(3),
            ..WorldConfig::default()
        });
        let mut player = Player::new(id.into(), PlayerKind::Human, position, String::new());
        player.size = size;
        state.insert_player(player);
        state
    }

    #[test]
    fn test_step_at_size_one_moves_base_speed() {
        let mut state = world_with("p", Vec2::ZERO, 1.0);
        let pos = step(&mut state, "p", Vec2::new(1.0, 0.0));
        assert_eq!(pos, Some(Vec2::new(0.2, 0.0)));
        assert!(state.index_consistent());
    }

    #[test]
    fn test_larger_players_move_slower() {
        let mut small = world_with("p", Vec2::ZERO, 1.0);
        let mut large = world_with("p", Vec2::ZERO, 32.0);
        let a = step(&mut small, "p", Vec2::new(0.0, 1.0)).unwrap().y;
        let b = step(&mut large, "p", Vec2::new(0.0, 1.0)).unwrap().y;
        assert!(a > b, "{} should exceed {}", a, b);
        assert!((b - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_clamped_to_world_edge() {
        let mut state = world_with("p", Vec2::new(499.9, -499.95), 1.0);
        let pos = step(&mut state, "p", Vec2::new(1.0, -1.0).normalize());
        assert_eq!(pos, Some(Vec2::new(500.0, -500.0)));
        assert!(state.index_consistent());
    }

    #[test]
    fn test_target_intent() {
        let mut state = world_with("p", Vec2::new(10.0, 10.0), 1.0);
        let pos = apply_intent(&mut state, "p", &MoveIntent::target(Vec2::new(10.0, 0.0)));
        let pos = pos.unwrap();
        assert!(pos.approx_eq(Vec2::new(10.0, 9.8), 1e-5), "{:?}", pos);
    }

    #[test]
    fn test_zero_and_nan_intents_do_not_move() {
        let start = Vec2::new(1.0, 2.0);
        let mut state = world_with("p", start, 1.0);

        assert!(apply_intent(&mut state, "p", &MoveIntent::target(start)).is_none());
        assert!(apply_intent(&mut state, "p", &MoveIntent::direction(Vec2::ZERO)).is_none());
        assert!(apply_intent(&mut state, "p", &MoveIntent::direction(Vec2::new(f32::NAN, 1.0))).is_none());
        assert!(step(&mut state, "p", Vec2::new(f32::INFINITY, 0.0)).is_none());

        assert_eq!(state.player("p").unwrap().position(), start);
    }

    #[test]
    fn test_missing_player_is_noop() {
        let mut state = world_with("p", Vec2::ZERO, 1.0);
        assert!(step(&mut state, "ghost", Vec2::new(1.0, 0.0)).is_none());
        assert!(apply_intent(&mut state, "ghost", &MoveIntent::direction(Vec2::new(1.0, 0.0))).is_none());
    }
}
