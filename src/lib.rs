//! Growth Arena Server Library
//!
//! Authoritative simulation core for a growth-and-consume arena: players
//! and bots roam a square world, absorb pickups and smaller players, and
//! avoid short-lived hazard zones. Networking lives outside this crate; it
//! drives a room through [`game::game_loop::RoomHandle`] and forwards the
//! per-client snapshots it gets back.

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;
