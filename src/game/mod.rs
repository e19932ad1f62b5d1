pub mod constants;
pub mod spatial;
pub mod state;
pub mod schedule;
pub mod systems;
pub mod world;
pub mod game_loop;
