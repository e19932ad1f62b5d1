pub mod protocol;
pub mod aoi;
