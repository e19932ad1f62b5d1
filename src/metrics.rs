//! Room metrics in Prometheus text format
//!
//! Counters are plain atomics so the stats logger and any exporter can read
//! them while the room task writes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::game::state::{GameEvent, PlayerKind, WorldState};

/// Tick samples kept for percentile calculation
const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for one room
#[derive(Debug)]
pub struct Metrics {
    // Population
    pub human_players: AtomicU64,
    pub bot_players: AtomicU64,
    pub pickup_count: AtomicU64,
    pub hazard_count: AtomicU64,

    // Gameplay events
    pub pickups_consumed: AtomicU64,
    pub players_consumed: AtomicU64,
    pub humans_consumed: AtomicU64,
    pub eliminations: AtomicU64,
    pub hazards_spawned: AtomicU64,

    // Inbound calls
    pub joins_rejected: AtomicU64,
    pub moves_received: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation (VecDeque for O(1) pop_front)
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            human_players: AtomicU64::new(0),
            bot_players: AtomicU64::new(0),
            pickup_count: AtomicU64::new(0),
            hazard_count: AtomicU64::new(0),
            pickups_consumed: AtomicU64::new(0),
            players_consumed: AtomicU64::new(0),
            humans_consumed: AtomicU64::new(0),
            eliminations: AtomicU64::new(0),
            hazards_spawned: AtomicU64::new(0),
            joins_rejected: AtomicU64::new(0),
            moves_received: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let last = sorted.len() - 1;
            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(last)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(last)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted[last], Ordering::Relaxed);
        }
    }

    /// Count gameplay events
    pub fn record_events(&self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::PickupConsumed { .. } => {
                    self.pickups_consumed.fetch_add(1, Ordering::Relaxed);
                }
                GameEvent::PlayerConsumed { victim_kind, .. } => {
                    self.players_consumed.fetch_add(1, Ordering::Relaxed);
                    if *victim_kind == PlayerKind::Human {
                        self.humans_consumed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                GameEvent::PlayerEliminated { .. } => {
                    self.eliminations.fetch_add(1, Ordering::Relaxed);
                }
                GameEvent::HazardSpawned { .. } => {
                    self.hazards_spawned.fetch_add(1, Ordering::Relaxed);
                }
                GameEvent::PickupRespawned { .. }
                | GameEvent::HazardExpired { .. }
                | GameEvent::BotRespawned { .. } => {}
            }
        }
    }

    /// Refresh population gauges from the world
    pub fn update_population(&self, state: &WorldState) {
        self.human_players.store(state.human_count() as u64, Ordering::Relaxed);
        self.bot_players.store(state.bot_count() as u64, Ordering::Relaxed);
        self.pickup_count.store(state.pickup_count() as u64, Ordering::Relaxed);
        self.hazard_count.store(state.hazard_count() as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn render_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("arena_players_human", "Number of human players", "gauge",
            self.human_players.load(Ordering::Relaxed));
        metric!("arena_players_bot", "Number of bot players", "gauge",
            self.bot_players.load(Ordering::Relaxed));
        metric!("arena_pickups", "Number of pickups in the world", "gauge",
            self.pickup_count.load(Ordering::Relaxed));
        metric!("arena_hazards", "Number of active hazard zones", "gauge",
            self.hazard_count.load(Ordering::Relaxed));

        metric!("arena_pickups_consumed_total", "Pickups consumed", "counter",
            self.pickups_consumed.load(Ordering::Relaxed));
        metric!("arena_players_consumed_total", "Players consumed by larger players", "counter",
            self.players_consumed.load(Ordering::Relaxed));
        metric!("arena_humans_consumed_total", "Human players consumed", "counter",
            self.humans_consumed.load(Ordering::Relaxed));
        metric!("arena_eliminations_total", "Players eliminated by hazard zones", "counter",
            self.eliminations.load(Ordering::Relaxed));
        metric!("arena_hazards_spawned_total", "Hazard zones spawned", "counter",
            self.hazards_spawned.load(Ordering::Relaxed));
        metric!("arena_joins_rejected_total", "Joins rejected because the room was full", "counter",
            self.joins_rejected.load(Ordering::Relaxed));
        metric!("arena_moves_received_total", "Movement intents received", "counter",
            self.moves_received.load(Ordering::Relaxed));

        metric!("arena_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("arena_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("arena_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("arena_uptime_seconds", "Room uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
