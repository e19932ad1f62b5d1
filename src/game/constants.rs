//! Default values for every world setting
//!
//! These are the values a room is created with when nothing overrides them;
//! see `config::WorldConfig` for the runtime copy.

/// World geometry
pub mod world {
    /// Side length of the square world, centred on the origin
    pub const SIZE: f32 = 1000.0;
    /// Side length of one spatial index cell
    pub const CELL_SIZE: f32 = 200.0;
    /// Radius around a player that is sent to its client
    pub const VISIBILITY_RANGE: f32 = 500.0;
}

/// Population constants
pub mod population {
    /// Pickups present after world-init and after every restart
    pub const PICKUP_COUNT: usize = 5000;
    /// Bots present in a room (one per 20 world units of side length)
    pub const BOT_COUNT: usize = (super::world::SIZE as usize) / 20;
    /// Delay before a consumed pickup is replaced (seconds)
    pub const PICKUP_RESPAWN_DELAY: f32 = 5.0;
    /// Delay before a bot removed by a hazard zone is recreated (seconds)
    pub const BOT_RESPAWN_DELAY: f32 = 5.0;
}

/// Player size and movement
pub mod growth {
    /// Size every player starts at and is reset to
    pub const START_SIZE: f32 = 1.0;
    /// Hard upper bound on size
    pub const MAX_SIZE: f32 = 50.0;
    /// Distance moved per step at size 1
    pub const BASE_SPEED: f32 = 0.2;
    /// Exponent of the size penalty: speed = BASE_SPEED / size^SPEED_EXPONENT
    pub const SPEED_EXPONENT: f32 = 0.4;
    /// Size gained per pickup
    pub const PICKUP_GAIN: f32 = 0.1;
    /// Fraction of the victim's size gained when consuming a player
    pub const PLAYER_GAIN_RATIO: f32 = 0.5;
    /// Pickup reach as a fraction of the consumer's size
    pub const PICKUP_REACH: f32 = 0.6;
    /// Player reach as a fraction of the size difference
    pub const PLAYER_REACH: f32 = 0.6;
    /// Seconds between bot steering steps
    pub const BOT_TICK_INTERVAL: f32 = 1.0 / 60.0;
}

/// Size decay for oversized players
pub mod decay {
    /// Players above this size decay toward it
    pub const THRESHOLD: f32 = 40.0;
    /// Decay applied per interval at MAX_SIZE
    pub const RATE: f32 = 0.1;
    /// Seconds between decay passes
    pub const INTERVAL: f32 = 1.0 / 60.0;
}

/// Hazard zones
pub mod hazard {
    /// Seconds between hazard spawns
    pub const SPAWN_INTERVAL: f32 = 30.0;
    /// Seconds a hazard stays in the world
    pub const LIFETIME: f32 = 30.0;
    /// Hazard radius
    pub const SIZE: f32 = 5.0;
    /// Elimination reach as a fraction of the hazard radius
    pub const REACH: f32 = 0.8;
}

/// Server loop
pub mod server {
    /// Wall-clock ticks per second driving `World::advance`
    pub const TICK_RATE: u32 = 60;
    /// Maximum human players per room
    pub const MAX_HUMANS: usize = 100;
    /// Seconds between periodic stats log lines
    pub const STATS_INTERVAL: u64 = 30;
}

/// Distance a player of `size` moves in one step
///
/// Monotonically decreasing in size; sizes below 1 are treated as 1 so the
/// result stays finite.
#[inline]
pub fn speed_for_size(base_speed: f32, size: f32) -> f32 {
    base_speed / size.max(growth::START_SIZE).powf(growth::SPEED_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_at_start_size_is_base_speed() {
        let speed = speed_for_size(growth::BASE_SPEED, growth::START_SIZE);
        assert!((speed - growth::BASE_SPEED).abs() < 1e-6);
    }

    #[test]
    fn test_speed_known_value() {
        // 0.2 / 32^0.4 = 0.2 / 4 = 0.05
        let speed = speed_for_size(0.2, 32.0);
        assert!((speed - 0.05).abs() < 1e-5, "got {}", speed);
    }

    #[test]
    fn test_speed_monotonically_decreasing() {
        let sizes = [1.0, 2.0, 5.0, 10.0, 25.0, 40.0, 50.0];
        for pair in sizes.windows(2) {
            let a = speed_for_size(growth::BASE_SPEED, pair[0]);
            let b = speed_for_size(growth::BASE_SPEED, pair[1]);
            assert!(a > b, "size {} ({}) should be faster than {} ({})", pair[0], a, pair[1], b);
        }
    }

    #[test]
    fn test_speed_no_nan_or_inf() {
        for size in [0.0, -1.0, f32::EPSILON, f32::MAX] {
            let s = speed_for_size(growth::BASE_SPEED, size);
            assert!(s.is_finite(), "non-finite speed for size {}", size);
        }
    }

    #[test]
    fn test_decay_threshold_below_max() {
        assert!(decay::THRESHOLD < growth::MAX_SIZE);
        assert!(decay::THRESHOLD >= growth::START_SIZE);
    }

    #[test]
    fn test_bot_count_derived_from_world_size() {
        assert_eq!(population::BOT_COUNT, 50);
    }
}
