pub mod movement;
pub mod steering;
pub mod collision;
pub mod lifecycle;
