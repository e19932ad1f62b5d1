use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{decay, growth, hazard, population, server, world};

/// Longest accepted delay or interval
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration errors detected before a world is created
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{field} is out of range: {reason}")]
    InvalidRange {
        field: &'static str,
        reason: &'static str,
    },
}

/// Settings fixed at world creation
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Side length of the square world, centred on the origin
    pub world_size: f32,
    /// Pickups kept in the world
    pub pickup_count: usize,
    /// Bots kept in the world
    pub bot_count: usize,
    /// Delay before a consumed pickup is replaced
    pub pickup_respawn_delay: Duration,
    /// Delay before a bot removed by a hazard is recreated
    pub bot_respawn_delay: Duration,
    /// Interval between bot steering steps
    pub bot_tick_interval: Duration,
    /// Step length at size 1
    pub base_speed: f32,
    /// Upper size bound
    pub max_size: f32,
    /// Size above which decay applies
    pub decay_threshold: f32,
    /// Decay per interval at max size
    pub decay_rate: f32,
    /// Interval between decay passes
    pub decay_interval: Duration,
    /// Radius of a client's visibility snapshot
    pub visibility_range: f32,
    /// Side length of a spatial index cell
    pub cell_size: f32,
    /// Interval between hazard spawns
    pub hazard_spawn_interval: Duration,
    /// How long a hazard stays in the world
    pub hazard_lifetime: Duration,
    /// Hazard radius
    pub hazard_size: f32,
    /// Seed for the world's random source (None = seeded from entropy)
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size: world::SIZE,
            pickup_count: population::PICKUP_COUNT,
            bot_count: population::BOT_COUNT,
            pickup_respawn_delay: Duration::from_secs_f32(population::PICKUP_RESPAWN_DELAY),
            bot_respawn_delay: Duration::from_secs_f32(population::BOT_RESPAWN_DELAY),
            bot_tick_interval: Duration::from_secs_f32(growth::BOT_TICK_INTERVAL),
            base_speed: growth::BASE_SPEED,
            max_size: growth::MAX_SIZE,
            decay_threshold: decay::THRESHOLD,
            decay_rate: decay::RATE,
            decay_interval: Duration::from_secs_f32(decay::INTERVAL),
            visibility_range: world::VISIBILITY_RANGE,
            cell_size: world::CELL_SIZE,
            hazard_spawn_interval: Duration::from_secs_f32(hazard::SPAWN_INTERVAL),
            hazard_lifetime: Duration::from_secs_f32(hazard::LIFETIME),
            hazard_size: hazard::SIZE,
            seed: None,
        }
    }
}

impl WorldConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        override_from_env("WORLD_SIZE", &mut config.world_size);
        override_from_env("PICKUP_COUNT", &mut config.pickup_count);
        override_from_env("BOT_COUNT", &mut config.bot_count);
        override_secs_from_env("PICKUP_RESPAWN_DELAY", &mut config.pickup_respawn_delay);
        override_secs_from_env("BOT_RESPAWN_DELAY", &mut config.bot_respawn_delay);
        override_secs_from_env("BOT_TICK_INTERVAL", &mut config.bot_tick_interval);
        override_from_env("BASE_SPEED", &mut config.base_speed);
        override_from_env("MAX_SIZE", &mut config.max_size);
        override_from_env("DECAY_THRESHOLD", &mut config.decay_threshold);
        override_from_env("DECAY_RATE", &mut config.decay_rate);
        override_secs_from_env("DECAY_INTERVAL", &mut config.decay_interval);
        override_from_env("VISIBILITY_RANGE", &mut config.visibility_range);
        override_from_env("CELL_SIZE", &mut config.cell_size);
        override_secs_from_env("HAZARD_SPAWN_INTERVAL", &mut config.hazard_spawn_interval);
        override_secs_from_env("HAZARD_LIFETIME", &mut config.hazard_lifetime);
        override_from_env("HAZARD_SIZE", &mut config.hazard_size);

        if let Ok(seed) = std::env::var("WORLD_SEED") {
            match seed.parse() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid WORLD_SEED '{}', using entropy", seed),
            }
        }

        config
    }

    /// Half the world side; positions lie in `[-half_extent, half_extent]`
    #[inline]
    pub fn half_extent(&self) -> f32 {
        self.world_size / 2.0
    }

    /// Validate configuration before a world is built from it
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("world_size", self.world_size),
            ("cell_size", self.cell_size),
            ("base_speed", self.base_speed),
            ("max_size", self.max_size),
            ("visibility_range", self.visibility_range),
            ("hazard_size", self.hazard_size),
        ];
        for (field, value) in positive {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field });
            }
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field });
            }
        }

        let intervals = [
            ("pickup_respawn_delay", self.pickup_respawn_delay),
            ("bot_respawn_delay", self.bot_respawn_delay),
            ("bot_tick_interval", self.bot_tick_interval),
            ("decay_interval", self.decay_interval),
            ("hazard_spawn_interval", self.hazard_spawn_interval),
            ("hazard_lifetime", self.hazard_lifetime),
        ];
        for (field, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::NonPositive { field });
            }
            if value > MAX_INTERVAL {
                return Err(ConfigError::InvalidRange {
                    field,
                    reason: "must not exceed one day",
                });
            }
        }

        if !self.decay_threshold.is_finite() {
            return Err(ConfigError::NotFinite { field: "decay_threshold" });
        }
        if self.decay_threshold < growth::START_SIZE || self.decay_threshold >= self.max_size {
            return Err(ConfigError::InvalidRange {
                field: "decay_threshold",
                reason: "must satisfy 1 <= decay_threshold < max_size",
            });
        }
        if !self.decay_rate.is_finite() {
            return Err(ConfigError::NotFinite { field: "decay_rate" });
        }
        if self.decay_rate < 0.0 {
            return Err(ConfigError::InvalidRange {
                field: "decay_rate",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}

/// Server loop configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Wall-clock ticks per second
    pub tick_rate: u32,
    /// Interval between stats log lines
    pub stats_interval: Duration,
    /// Maximum concurrent human players in the room
    pub max_humans: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: server::TICK_RATE,
            stats_interval: Duration::from_secs(server::STATS_INTERVAL),
            max_humans: server::MAX_HUMANS,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(rate) = std::env::var("TICK_RATE") {
            if let Ok(parsed) = rate.parse::<u32>() {
                if parsed > 0 && parsed <= 1000 {
                    config.tick_rate = parsed;
                } else {
                    tracing::warn!("TICK_RATE must be 1-1000, using default");
                }
            } else {
                tracing::warn!("Invalid TICK_RATE '{}', using default", rate);
            }
        }

        if let Ok(secs) = std::env::var("STATS_INTERVAL_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                if parsed > 0 {
                    config.stats_interval = Duration::from_secs(parsed);
                } else {
                    tracing::warn!("STATS_INTERVAL_SECS must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid STATS_INTERVAL_SECS '{}', using default", secs);
            }
        }

        override_from_env("MAX_HUMANS", &mut config.max_humans);

        config
    }

    /// Wall-clock duration of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

fn override_from_env<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Invalid {} '{}', using default", name, raw),
        }
    }
}

fn override_secs_from_env(name: &str, target: &mut Duration) {
    if let Ok(raw) = std::env::var(name) {
        let parsed = raw
            .parse::<f32>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f32(secs).ok());
        match parsed {
            Some(duration) if !duration.is_zero() => *target = duration,
            _ => tracing::warn!("Invalid {} '{}', using default", name, raw),
        }
    }
}
